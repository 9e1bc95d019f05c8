//! In-memory store client for testing.

use object_store::memory::InMemory;
use std::sync::Arc;

use super::driver::ObjectStoreClient;

/// Create an in-memory store client
///
/// Primarily useful for tests; nothing persists between runs.
pub fn open() -> ObjectStoreClient {
    ObjectStoreClient::new(Arc::new(InMemory::new()), "memory")
}
