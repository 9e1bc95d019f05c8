//! Copy engine orchestration.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{worker, TransferTask};
use crate::cancel::CancelToken;
use crate::config::CopyOptions;
use crate::context::RunContext;
use crate::diff::{self, CopyDecision};
use crate::list::{enumerate, PAGE_SIZE};
use crate::stats::{report_progress, RunReport, RunStats};
use crate::storage::{ObjectKey, ObjectMetadata, StoreClient};
use crate::{Error, Result};

/// Bound on candidates queued between enumeration and the checker stage.
const CANDIDATE_QUEUE_DEPTH: usize = 1024;

/// Copy engine for transferring objects between two stores.
pub struct CopyEngine {
    source: Arc<dyn StoreClient>,
    dest: Arc<dyn StoreClient>,
    source_prefix: String,
    dest_prefix: String,
    options: Arc<CopyOptions>,
    ctx: Arc<RunContext>,
}

impl CopyEngine {
    /// Create a new copy engine.
    pub fn new(
        source: Arc<dyn StoreClient>,
        dest: Arc<dyn StoreClient>,
        source_prefix: impl Into<String>,
        dest_prefix: impl Into<String>,
        options: CopyOptions,
    ) -> Result<Self> {
        options.validate()?;
        let ctx = RunContext::new(&options);

        Ok(Self {
            source,
            dest,
            source_prefix: normalize_prefix(source_prefix.into()),
            dest_prefix: normalize_prefix(dest_prefix.into()),
            options: Arc::new(options),
            ctx,
        })
    }

    /// Token observing this run's cancellation signal.
    pub fn cancel_token(&self) -> CancelToken {
        self.ctx.cancel.clone()
    }

    /// Signal the run to stop.
    pub fn shutdown(&self) {
        self.ctx.cancel.cancel();
    }

    /// Live counters for this run.
    pub fn stats(&self) -> Arc<RunStats> {
        self.ctx.stats.clone()
    }

    /// Run the copy to completion.
    ///
    /// Per-object failures are recorded in the report and never abort the
    /// run; the error return is reserved for fatal conditions such as the
    /// very first listing call being rejected.
    pub async fn run(&self) -> Result<RunReport> {
        let ctx = self.ctx.clone();
        info!(
            "Copying '{}' -> '{}' with {} transfers, {} checkers",
            self.source_prefix, self.dest_prefix, self.options.transfers, self.options.checkers
        );

        let reporter = tokio::spawn(report_progress(
            ctx.stats.clone(),
            Duration::from_secs(self.options.stats_interval_secs),
            ctx.cancel.clone(),
        ));

        // Enumeration feeds candidates through a bounded queue so listing
        // never runs unboundedly ahead of the checkers.
        let (cand_tx, cand_rx) = mpsc::channel(CANDIDATE_QUEUE_DEPTH);
        let lister = tokio::spawn(list_candidates(
            self.source.clone(),
            self.source_prefix.clone(),
            ctx.clone(),
            cand_tx,
        ));

        let (task_tx, task_rx) = mpsc::channel(self.options.transfers * 2);
        let checker = tokio::spawn(check_candidates(
            self.dest.clone(),
            self.source_prefix.clone(),
            self.dest_prefix.clone(),
            ctx.clone(),
            cand_rx,
            task_tx,
            self.options.checkers,
        ));

        // Transfer stage runs inline; worker outcomes land in RunStats.
        let source = self.source.clone();
        let dest = self.dest.clone();
        let options = self.options.clone();
        stream::unfold(task_rx, |mut rx| async move {
            rx.recv().await.map(|task| (task, rx))
        })
        .map(|task| {
            worker::run_task(
                ctx.clone(),
                source.clone(),
                dest.clone(),
                task,
                options.clone(),
            )
        })
        .buffer_unordered(self.options.transfers)
        .for_each(|_outcome| async {})
        .await;

        let listing = lister.await.map_err(join_error)?;
        checker.await.map_err(join_error)?;
        reporter.abort();

        let listing_error = match listing {
            Ok(()) | Err(Error::Cancelled) => None,
            Err(e) => {
                if self.ctx.stats.snapshot().objects_found == 0 && !self.ctx.cancel.is_cancelled()
                {
                    // Nothing was enumerated before the failure; treat the
                    // run itself as failed (e.g. rejected credentials).
                    return Err(e);
                }
                Some(e.to_string())
            }
        };

        let report = self
            .ctx
            .stats
            .report(self.ctx.cancel.is_cancelled(), listing_error);
        info!("{}", report);
        Ok(report)
    }
}

fn normalize_prefix(prefix: String) -> String {
    prefix.trim_matches('/').to_string()
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::Io(std::io::Error::other(format!("stage task failed: {}", err)))
}

/// Map a source key to its destination key by swapping prefixes.
pub fn map_key(src_key: &ObjectKey, source_prefix: &str, dest_prefix: &str) -> ObjectKey {
    // Only strip at a path-segment boundary.
    let rel = match src_key.as_str().strip_prefix(source_prefix) {
        Some(rest) if source_prefix.is_empty() || rest.is_empty() || rest.starts_with('/') => {
            rest.trim_start_matches('/')
        }
        _ => src_key.as_str(),
    };

    if dest_prefix.is_empty() {
        ObjectKey::new(rel)
    } else if rel.is_empty() {
        ObjectKey::new(dest_prefix)
    } else {
        ObjectKey::new(format!("{}/{}", dest_prefix, rel))
    }
}

/// Enumeration stage: stream source keys into the candidate queue.
async fn list_candidates(
    store: Arc<dyn StoreClient>,
    prefix: String,
    ctx: Arc<RunContext>,
    tx: mpsc::Sender<(ObjectKey, ObjectMetadata)>,
) -> Result<()> {
    let entries = enumerate(store, prefix, PAGE_SIZE, ctx.clone());
    futures::pin_mut!(entries);

    loop {
        let item = tokio::select! {
            item = entries.next() => item,
            _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
        };

        match item {
            Some(Ok(entry)) => {
                ctx.stats.record_found(1);
                if tx.send(entry).await.is_err() {
                    // Downstream closed; nothing left to feed.
                    return Ok(());
                }
            }
            Some(Err(e)) => return Err(e),
            None => {
                ctx.stats.mark_listing_complete();
                return Ok(());
            }
        }
    }
}

/// Checker stage: stat the destination for each candidate and queue the
/// ones that need transferring.
async fn check_candidates(
    dest: Arc<dyn StoreClient>,
    source_prefix: String,
    dest_prefix: String,
    ctx: Arc<RunContext>,
    rx: mpsc::Receiver<(ObjectKey, ObjectMetadata)>,
    tx: mpsc::Sender<TransferTask>,
    checkers: usize,
) {
    let inner_ctx = ctx.clone();
    let results = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|candidate| (candidate, rx))
    })
    .map(move |(src_key, meta)| {
        let ctx = inner_ctx.clone();
        let dest = dest.clone();
        let dest_key = map_key(&src_key, &source_prefix, &dest_prefix);
        async move {
            let outcome = check_one(&ctx, &dest, &src_key, &dest_key, meta).await;
            (src_key, outcome)
        }
    })
    .buffer_unordered(checkers);
    futures::pin_mut!(results);

    while let Some((src_key, outcome)) = results.next().await {
        match outcome {
            Ok(Some(task)) => {
                if tx.send(task).await.is_err() {
                    return;
                }
            }
            Ok(None) => ctx.stats.record_skipped(),
            // Remaining candidates will observe the same signal; just drain.
            Err(Error::Cancelled) => {}
            Err(e) => ctx.stats.record_failure(src_key.as_str(), &e),
        }
    }
}

async fn check_one(
    ctx: &Arc<RunContext>,
    dest: &Arc<dyn StoreClient>,
    src_key: &ObjectKey,
    dest_key: &ObjectKey,
    meta: ObjectMetadata,
) -> Result<Option<TransferTask>> {
    if ctx.cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let existing = match ctx
        .remote("stat destination", || {
            let dest = dest.clone();
            let key = dest_key.clone();
            async move { dest.head(key.as_str()).await }
        })
        .await
    {
        Ok(found) => Some(found),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    match diff::decide(&meta, existing.as_ref()) {
        CopyDecision::Skip => {
            debug!("Skipping {} (identical)", src_key);
            Ok(None)
        }
        CopyDecision::Copy(reason) => {
            debug!("Queueing {}: {}", src_key, reason);
            Ok(Some(TransferTask {
                src_key: src_key.clone(),
                dest_key: dest_key.clone(),
                meta,
            }))
        }
    }
}
