//! Google Cloud Storage client using object_store.

use object_store::gcp::GoogleCloudStorageBuilder;
use std::sync::Arc;
use tracing::info;

use super::driver::ObjectStoreClient;
use crate::error::StorageError;
use crate::{Error, Result};

/// Google Cloud Storage client configuration
#[derive(Debug, Clone, Default)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,
    /// Path to a service account JSON key file (if None, Application Default
    /// Credentials are used)
    pub service_account_path: Option<String>,
}

/// Create a client for a GCS bucket
pub fn open(config: &GcsConfig) -> Result<ObjectStoreClient> {
    let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&config.bucket);

    if let Some(path) = &config.service_account_path {
        builder = builder.with_service_account_path(path);
    }

    let store = builder.build().map_err(|e| {
        Error::Storage(StorageError::Backend(format!(
            "Failed to create GCS client: {}",
            e
        )))
    })?;

    info!("Opened GCS store for bucket: {}", config.bucket);

    Ok(ObjectStoreClient::new(Arc::new(store), "gcs"))
}
