//! Lazy enumeration of a store prefix.

use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;

use crate::context::RunContext;
use crate::storage::{ObjectKey, ObjectMetadata, StoreClient};
use crate::Result;

/// How many keys one listing call asks for.
pub const PAGE_SIZE: usize = 1000;

/// Stream every object under `prefix`, page by page.
///
/// Pages are fetched on demand through the run's rate limiter and retry
/// policy, so a transient listing failure retries the same page (the
/// continuation token is only advanced on success) and the full tree is
/// never held in memory. Barring store-side mutation during the scan, each
/// key is yielded exactly once.
pub fn enumerate(
    store: Arc<dyn StoreClient>,
    prefix: String,
    page_size: usize,
    ctx: Arc<RunContext>,
) -> impl Stream<Item = Result<(ObjectKey, ObjectMetadata)>> + Send {
    // Outer state is the continuation token: Some(None) before the first
    // page, Some(Some(token)) mid-listing, None when exhausted.
    stream::try_unfold(Some(None::<String>), move |state| {
        let store = store.clone();
        let prefix = prefix.clone();
        let ctx = ctx.clone();
        async move {
            let Some(token) = state else {
                return Ok::<_, crate::Error>(None);
            };

            let page = ctx
                .remote("list", || {
                    let store = store.clone();
                    let prefix = prefix.clone();
                    let token = token.clone();
                    async move { store.list_page(&prefix, token.as_deref(), page_size).await }
                })
                .await?;

            let next_state = page.next.map(Some);
            let items = stream::iter(page.objects.into_iter().map(Ok));
            Ok(Some((items, next_state)))
        }
    })
    .try_flatten()
}
