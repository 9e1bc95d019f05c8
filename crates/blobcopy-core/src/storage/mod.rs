//! Store client abstraction and backend implementations.
//!
//! This module provides a uniform client surface over multiple object
//! stores:
//!
//! - **S3**: AWS S3 and S3-compatible services (MinIO, Ceph RGW, OSS, etc.)
//! - **Azure**: Azure Blob Storage
//! - **GCS**: Google Cloud Storage
//! - **Filesystem**: Local filesystem
//! - **Memory**: In-memory store (for testing)

mod azure;
mod backend;
mod config;
mod driver;
mod filesystem;
mod gcs;
mod memory;
mod s3;

pub use azure::AzureConfig;
pub use backend::{ListPage, ObjectKey, ObjectMetadata, PartUpload, StoreClient};
pub use config::StoreConfig;
pub use gcs::GcsConfig;
pub use s3::S3Config;

use crate::Result;
use std::sync::Arc;

/// Create a store client from configuration.
///
/// # Example
///
/// ```rust,ignore
/// use blobcopy_core::storage::{open_store, StoreConfig};
///
/// let store = open_store(&StoreConfig::Memory)?;
/// ```
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn StoreClient>> {
    match config {
        StoreConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
            prefix: _,
            allow_http,
        } => {
            let s3_config = S3Config {
                bucket: bucket.clone(),
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key_id: access_key.clone(),
                secret_access_key: secret_key.clone(),
                allow_http: *allow_http,
            };
            Ok(Arc::new(s3::open(&s3_config)?))
        }

        StoreConfig::Azure {
            account_name,
            container_name,
            account_key,
            endpoint,
            prefix: _,
        } => {
            let azure_config = AzureConfig {
                account_name: account_name.clone(),
                container_name: container_name.clone(),
                account_key: account_key.clone(),
                endpoint: endpoint.clone(),
            };
            Ok(Arc::new(azure::open(&azure_config)?))
        }

        StoreConfig::Gcs {
            bucket,
            service_account_path,
            prefix: _,
        } => {
            let gcs_config = GcsConfig {
                bucket: bucket.clone(),
                service_account_path: service_account_path.clone(),
            };
            Ok(Arc::new(gcs::open(&gcs_config)?))
        }

        StoreConfig::Filesystem { path } => Ok(Arc::new(filesystem::open(path)?)),

        StoreConfig::Memory => Ok(Arc::new(memory::open())),
    }
}
