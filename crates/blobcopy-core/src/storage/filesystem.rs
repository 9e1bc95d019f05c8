//! Local filesystem store client using object_store.
//!
//! Backed by `object_store::local::LocalFileSystem` so range reads and
//! multipart semantics behave like the remote backends.

use object_store::local::LocalFileSystem;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::driver::ObjectStoreClient;
use crate::error::StorageError;
use crate::{Error, Result};

/// Create a client rooted at a local directory
pub fn open(base_path: &Path) -> Result<ObjectStoreClient> {
    std::fs::create_dir_all(base_path).map_err(|e| {
        Error::Storage(StorageError::Backend(format!(
            "Failed to create base directory {}: {}",
            base_path.display(),
            e
        )))
    })?;

    let store = LocalFileSystem::new_with_prefix(base_path).map_err(|e| {
        Error::Storage(StorageError::Backend(format!(
            "Failed to open filesystem store at {}: {}",
            base_path.display(),
            e
        )))
    })?;

    info!("Opened filesystem store at: {}", base_path.display());

    Ok(ObjectStoreClient::new(Arc::new(store), "file"))
}
