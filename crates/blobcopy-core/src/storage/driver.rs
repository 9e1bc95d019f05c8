//! Shared `object_store`-backed client implementation.
//!
//! Every backend builds an [`object_store::ObjectStore`] (see the sibling
//! modules) and wraps it here, so listing pagination, range reads, multipart
//! plumbing and error classification live in one place.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use futures::StreamExt;
use object_store::path::Path;
use object_store::{MultipartUpload, ObjectStore, PutPayload};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

use super::{ListPage, ObjectKey, ObjectMetadata, PartUpload, StoreClient};
use crate::error::StorageError;
use crate::{Error, Result};

/// Client over any `object_store` implementation.
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    scheme: &'static str,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, scheme: &'static str) -> Self {
        Self { store, scheme }
    }
}

/// Map an `object_store` error onto the library's taxonomy.
fn classify(scheme: &str, op: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { path, .. } => {
            Error::Storage(StorageError::NotFound(path))
        }
        object_store::Error::PermissionDenied { path, source } => Error::Storage(
            StorageError::PermissionDenied(format!("{}: {}", path, source)),
        ),
        object_store::Error::Unauthenticated { path, source } => Error::Storage(
            StorageError::PermissionDenied(format!("{}: {}", path, source)),
        ),
        object_store::Error::InvalidPath { source } => {
            Error::Storage(StorageError::InvalidRequest(source.to_string()))
        }
        object_store::Error::NotSupported { source } => {
            Error::Storage(StorageError::InvalidRequest(source.to_string()))
        }
        object_store::Error::AlreadyExists { path, .. } => Error::Storage(
            StorageError::InvalidRequest(format!("already exists: {}", path)),
        ),
        object_store::Error::Precondition { path, .. } => Error::Storage(
            StorageError::InvalidRequest(format!("precondition failed: {}", path)),
        ),
        object_store::Error::NotImplemented => Error::Storage(StorageError::InvalidRequest(
            format!("{} does not support {}", scheme, op),
        )),
        object_store::Error::UnknownConfigurationKey { key, .. } => Error::Storage(
            StorageError::InvalidRequest(format!("unknown configuration key: {}", key)),
        ),
        // Remaining variants are transport-level (network, 5xx, join) and
        // worth retrying.
        other => Error::Storage(StorageError::Backend(format!(
            "{} {} failed: {}",
            scheme, op, other
        ))),
    }
}

fn convert_meta(meta: &object_store::ObjectMeta) -> ObjectMetadata {
    ObjectMetadata {
        size: meta.size as u64,
        last_modified: meta.last_modified.timestamp_millis(),
        e_tag: meta.e_tag.clone(),
    }
}

#[async_trait]
impl StoreClient for ObjectStoreClient {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<ListPage> {
        debug!("{} LIST prefix={:?} from={:?}", self.scheme, prefix, continuation);

        let prefix_path = (!prefix.is_empty()).then(|| Path::from(prefix));
        let mut stream = match continuation {
            Some(token) => self
                .store
                .list_with_offset(prefix_path.as_ref(), &Path::from(token)),
            None => self.store.list(prefix_path.as_ref()),
        };

        let mut objects = Vec::new();
        while objects.len() < limit {
            match stream.next().await {
                Some(Ok(meta)) => {
                    let key = ObjectKey::new(meta.location.to_string());
                    objects.push((key, convert_meta(&meta)));
                }
                Some(Err(e)) => return Err(classify(self.scheme, "list", e)),
                None => return Ok(ListPage { objects, next: None }),
            }
        }

        // A full page may have more behind it; resume after its last key.
        let next = objects.last().map(|(key, _)| key.as_str().to_string());
        Ok(ListPage { objects, next })
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        let path = Path::from(key);
        debug!("{} HEAD: {}", self.scheme, path);

        let meta = self
            .store
            .head(&path)
            .await
            .map_err(|e| classify(self.scheme, "head", e))?;

        Ok(convert_meta(&meta))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = Path::from(key);
        debug!("{} GET: {}", self.scheme, path);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| classify(self.scheme, "get", e))?;

        result
            .bytes()
            .await
            .map_err(|e| classify(self.scheme, "get", e))
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        let path = Path::from(key);
        debug!("{} GET: {} [{}..{})", self.scheme, path, range.start, range.end);

        self.store
            .get_range(&path, range.start as usize..range.end as usize)
            .await
            .map_err(|e| classify(self.scheme, "get_range", e))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Path::from(key);
        debug!("{} PUT: {} ({} bytes)", self.scheme, path, data.len());

        self.store
            .put(&path, PutPayload::from_bytes(data))
            .await
            .map_err(|e| classify(self.scheme, "put", e))?;

        Ok(())
    }

    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>> {
        let path = Path::from(key);
        debug!("{} CREATE MULTIPART: {}", self.scheme, path);

        let upload = self
            .store
            .put_multipart(&path)
            .await
            .map_err(|e| classify(self.scheme, "create multipart", e))?;

        Ok(Box::new(ObjectStorePartUpload {
            upload,
            scheme: self.scheme,
        }))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = Path::from(key);
        debug!("{} DELETE: {}", self.scheme, path);

        self.store
            .delete(&path)
            .await
            .map_err(|e| classify(self.scheme, "delete", e))?;

        Ok(())
    }
}

struct ObjectStorePartUpload {
    upload: Box<dyn MultipartUpload>,
    scheme: &'static str,
}

#[async_trait]
impl PartUpload for ObjectStorePartUpload {
    fn put_part(&mut self, data: Bytes) -> BoxFuture<'static, Result<()>> {
        let scheme = self.scheme;
        let fut = self.upload.put_part(PutPayload::from_bytes(data));
        async move { fut.await.map_err(|e| classify(scheme, "upload part", e)) }.boxed()
    }

    async fn complete(&mut self) -> Result<()> {
        self.upload
            .complete()
            .await
            .map(|_| ())
            .map_err(|e| classify(self.scheme, "complete multipart", e))
    }

    async fn abort(&mut self) -> Result<()> {
        self.upload
            .abort()
            .await
            .map_err(|e| classify(self.scheme, "abort multipart", e))
    }
}
