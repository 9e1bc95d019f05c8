//! Azure Blob Storage client using object_store.

use object_store::azure::MicrosoftAzureBuilder;
use std::sync::Arc;
use tracing::info;

use super::driver::ObjectStoreClient;
use crate::error::StorageError;
use crate::{Error, Result};

/// Azure Blob Storage client configuration
#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    /// Storage account name
    pub account_name: String,
    /// Blob container name
    pub container_name: String,
    /// Account key (if None, the builder falls back to environment
    /// credentials)
    pub account_key: Option<String>,
    /// Custom endpoint URL for sovereign clouds
    pub endpoint: Option<String>,
}

/// Create a client for an Azure blob container
pub fn open(config: &AzureConfig) -> Result<ObjectStoreClient> {
    let mut builder = MicrosoftAzureBuilder::from_env()
        .with_account(&config.account_name)
        .with_container_name(&config.container_name);

    if let Some(key) = &config.account_key {
        builder = builder.with_access_key(key);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint.clone());
    }

    let store = builder.build().map_err(|e| {
        Error::Storage(StorageError::Backend(format!(
            "Failed to create Azure client: {}",
            e
        )))
    })?;

    info!(
        "Opened Azure store for container: {} (account: {})",
        config.container_name, config.account_name
    );

    Ok(ObjectStoreClient::new(Arc::new(store), "azure"))
}
