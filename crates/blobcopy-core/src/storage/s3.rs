//! S3-compatible store client using object_store.

use object_store::aws::AmazonS3Builder;
use std::sync::Arc;
use tracing::info;

use super::driver::ObjectStoreClient;
use crate::error::StorageError;
use crate::{Error, Result};

/// S3 client configuration
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: Option<String>,
    /// Custom endpoint (for S3-compatible services like MinIO or OSS)
    pub endpoint: Option<String>,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Allow HTTP (insecure) connections
    pub allow_http: bool,
}

/// Create a client for an S3 or S3-compatible bucket
pub fn open(config: &S3Config) -> Result<ObjectStoreClient> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
        // Custom endpoints generally need virtual hosted style disabled
        builder = builder.with_virtual_hosted_style_request(false);
    }

    if let Some(access_key) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key);
    }

    if let Some(secret_key) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret_key);
    }

    if config.allow_http {
        builder = builder.with_allow_http(true);
    }

    let store = builder.build().map_err(|e| {
        Error::Storage(StorageError::Backend(format!(
            "Failed to create S3 client: {}",
            e
        )))
    })?;

    info!("Opened S3 store for bucket: {}", config.bucket);

    Ok(ObjectStoreClient::new(Arc::new(store), "s3"))
}
