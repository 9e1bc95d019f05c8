//! Store client trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::ops::Range;

use crate::Result;

/// A key within a store's namespace. Unique per store, ordered so listings
/// and diffs can be compared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Metadata about a stored object
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (epoch milliseconds)
    pub last_modified: i64,
    /// ETag or content hash (if available)
    pub e_tag: Option<String>,
}

/// One page of a listing, restartable from `next`.
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Keys and metadata, in key order.
    pub objects: Vec<(ObjectKey, ObjectMetadata)>,
    /// Opaque continuation token; `None` means the listing is exhausted.
    pub next: Option<String>,
}

/// Trait for object store clients
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch one page of keys under a prefix. Passing back the returned
    /// continuation token resumes after the last key of this page, so a
    /// listing never materializes the full tree.
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<ListPage>;

    /// Get object metadata (size, last modified, etc.)
    async fn head(&self, key: &str) -> Result<ObjectMetadata>;

    /// Read a whole object
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Read one byte range of an object
    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes>;

    /// Write data to a key in one shot
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Begin a multipart upload for a key
    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Handle for one in-progress multipart upload.
///
/// Part indices are assigned by call order of `put_part`; the returned
/// futures may be awaited concurrently, and `complete` must only be called
/// after all of them have resolved. An upload that is neither completed nor
/// aborted leaves dangling state on the backend, so failure paths must call
/// `abort`.
#[async_trait]
pub trait PartUpload: Send {
    /// Queue one part. The future resolves when the backend acknowledges it.
    fn put_part(&mut self, data: Bytes) -> BoxFuture<'static, Result<()>>;

    /// Commit all acknowledged parts as the final object.
    async fn complete(&mut self) -> Result<()>;

    /// Abandon the upload, discarding uploaded parts.
    async fn abort(&mut self) -> Result<()>;
}
