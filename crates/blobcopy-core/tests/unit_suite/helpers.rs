//! Test helper utilities.
//!
//! Store construction, data generation and instrumented store wrappers used
//! across the scenario tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use blobcopy_core::storage::{
    open_store, ListPage, ObjectMetadata, PartUpload, StoreClient, StoreConfig,
};
use blobcopy_core::{CancelToken, CopyOptions, Error, Result, StorageError};

/// Fresh in-memory store.
pub fn memory_store() -> Arc<dyn StoreClient> {
    open_store(&StoreConfig::Memory).unwrap()
}

/// Options tuned for fast tests: small chunks, no real backoff waits.
pub fn test_options() -> CopyOptions {
    CopyOptions {
        transfers: 4,
        checkers: 4,
        chunk_size: 16 * 1024,
        upload_concurrency: 2,
        retries: 1,
        low_level_retries: 2,
        retry_sleep_ms: 1,
        ..Default::default()
    }
}

/// Deterministic pseudo-random bytes for content comparisons.
pub fn generate_bytes(size: usize) -> Bytes {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut bytes = Vec::with_capacity(size);
    let mut hasher = DefaultHasher::new();
    for i in 0..size {
        i.hash(&mut hasher);
        bytes.push((hasher.finish() % 256) as u8);
    }
    Bytes::from(bytes)
}

/// Seed `count` small objects under `prefix`.
pub async fn seed_objects(store: &Arc<dyn StoreClient>, prefix: &str, count: usize) {
    for i in 0..count {
        store
            .put(
                &format!("{}/obj-{:04}", prefix, i),
                Bytes::from(format!("payload-{}", i)),
            )
            .await
            .unwrap();
    }
}

/// Tracks multipart upload lifecycles on a wrapped store.
#[derive(Default)]
pub struct MultipartLedger {
    pub created: AtomicU64,
    pub completed: AtomicU64,
    pub aborted: AtomicU64,
}

impl MultipartLedger {
    /// Every created upload must have reached a terminal state.
    pub fn assert_no_dangling(&self) {
        let created = self.created.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        let aborted = self.aborted.load(Ordering::SeqCst);
        assert_eq!(
            created,
            completed + aborted,
            "dangling multipart uploads: created={} completed={} aborted={}",
            created,
            completed,
            aborted
        );
    }
}

/// Store wrapper that counts multipart lifecycles and can fire a
/// cancellation token on the first uploaded part.
pub struct CountingStore {
    inner: Arc<dyn StoreClient>,
    pub ledger: Arc<MultipartLedger>,
    cancel_on_first_part: Mutex<Option<CancelToken>>,
    fired: Arc<AtomicBool>,
    /// When set, every part upload fails with an error of this class.
    pub fail_parts: Option<fn() -> Error>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn StoreClient>) -> Self {
        Self {
            inner,
            ledger: Arc::new(MultipartLedger::default()),
            cancel_on_first_part: Mutex::new(None),
            fired: Arc::new(AtomicBool::new(false)),
            fail_parts: None,
        }
    }

    pub fn cancel_on_first_part(&self, token: CancelToken) {
        *self.cancel_on_first_part.lock() = Some(token);
    }
}

#[async_trait]
impl StoreClient for CountingStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<ListPage> {
        self.inner.list_page(prefix, continuation, limit).await
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        self.inner.get_range(key, range).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.inner.put(key, data).await
    }

    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>> {
        let inner = self.inner.start_multipart(key).await?;
        self.ledger.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingUpload {
            inner,
            ledger: self.ledger.clone(),
            cancel: self.cancel_on_first_part.lock().clone(),
            fired: self.fired.clone(),
            fail_parts: self.fail_parts,
        }))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

struct CountingUpload {
    inner: Box<dyn PartUpload>,
    ledger: Arc<MultipartLedger>,
    cancel: Option<CancelToken>,
    fired: Arc<AtomicBool>,
    fail_parts: Option<fn() -> Error>,
}

#[async_trait]
impl PartUpload for CountingUpload {
    fn put_part(&mut self, data: Bytes) -> BoxFuture<'static, Result<()>> {
        if let Some(cancel) = &self.cancel {
            if !self.fired.swap(true, Ordering::SeqCst) {
                cancel.cancel();
            }
        }
        if let Some(fail) = self.fail_parts {
            return Box::pin(async move { Err(fail()) });
        }
        self.inner.put_part(data)
    }

    async fn complete(&mut self) -> Result<()> {
        self.inner.complete().await?;
        self.ledger.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.inner.abort().await?;
        self.ledger.aborted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store wrapper that rejects single-shot puts for one key.
pub struct FailingPutStore {
    inner: Arc<dyn StoreClient>,
    fail_key: String,
    pub put_attempts: AtomicU64,
}

impl FailingPutStore {
    pub fn new(inner: Arc<dyn StoreClient>, fail_key: impl Into<String>) -> Self {
        Self {
            inner,
            fail_key: fail_key.into(),
            put_attempts: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl StoreClient for FailingPutStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<ListPage> {
        self.inner.list_page(prefix, continuation, limit).await
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        self.inner.get_range(key, range).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if key == self.fail_key {
            return Err(Error::Storage(StorageError::PermissionDenied(
                key.to_string(),
            )));
        }
        self.inner.put(key, data).await
    }

    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>> {
        self.inner.start_multipart(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Store wrapper whose listings are always rejected.
pub struct FailingListStore {
    inner: Arc<dyn StoreClient>,
}

impl FailingListStore {
    pub fn new(inner: Arc<dyn StoreClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StoreClient for FailingListStore {
    async fn list_page(
        &self,
        _prefix: &str,
        _continuation: Option<&str>,
        _limit: usize,
    ) -> Result<ListPage> {
        Err(Error::Storage(StorageError::PermissionDenied(
            "listing rejected".to_string(),
        )))
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        self.inner.get_range(key, range).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.inner.put(key, data).await
    }

    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>> {
        self.inner.start_multipart(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Store wrapper that silently drops the last byte of every single-shot put,
/// making post-transfer verification fail.
pub struct TruncatingStore {
    inner: Arc<dyn StoreClient>,
    pub put_attempts: AtomicU64,
}

impl TruncatingStore {
    pub fn new(inner: Arc<dyn StoreClient>) -> Self {
        Self {
            inner,
            put_attempts: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl StoreClient for TruncatingStore {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        limit: usize,
    ) -> Result<ListPage> {
        self.inner.list_page(prefix, continuation, limit).await
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_range(&self, key: &str, range: Range<u64>) -> Result<Bytes> {
        self.inner.get_range(key, range).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        let truncated = data.slice(..data.len().saturating_sub(1));
        self.inner.put(key, truncated).await
    }

    async fn start_multipart(&self, key: &str) -> Result<Box<dyn PartUpload>> {
        self.inner.start_multipart(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}
