//! Per-object transfer execution.

use bytes::Bytes;
use futures::stream::{self, FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::chunk::ChunkPlan;
use super::TransferTask;
use crate::config::CopyOptions;
use crate::context::RunContext;
use crate::error::{Error, ErrorClass};
use crate::storage::{PartUpload, StoreClient};
use crate::Result;

/// Terminal state of one transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Done,
    Failed,
    Cancelled,
}

struct InFlightGuard<'a>(&'a crate::stats::RunStats);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.end_transfer();
    }
}

/// Drive one task to a terminal state, redoing the whole object on transient
/// failure up to the object-level retry budget.
pub(crate) async fn run_task(
    ctx: Arc<RunContext>,
    source: Arc<dyn StoreClient>,
    dest: Arc<dyn StoreClient>,
    task: TransferTask,
    options: Arc<CopyOptions>,
) -> TaskOutcome {
    if ctx.cancel.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    ctx.stats.begin_transfer();
    let _guard = InFlightGuard(&ctx.stats);

    let mut object_attempt = 0u32;
    let mut integrity_retry_used = false;
    loop {
        if ctx.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        match copy_object(&ctx, &source, &dest, &task, &options).await {
            Ok(bytes) => {
                ctx.stats.record_done(bytes);
                info!("Copied {} ({} bytes)", task.src_key, bytes);
                return TaskOutcome::Done;
            }
            Err(e) if e.class() == ErrorClass::Cancelled => {
                return TaskOutcome::Cancelled;
            }
            // An integrity mismatch gets exactly one extra whole-object
            // redo; a second mismatch fails the task.
            Err(e @ Error::Integrity { .. }) if !integrity_retry_used => {
                warn!("Integrity mismatch for {}, redoing object: {}", task.src_key, e);
                integrity_retry_used = true;
            }
            Err(e) => {
                let give_up = e.class() == ErrorClass::Permanent
                    || matches!(e, Error::Integrity { .. })
                    || object_attempt >= options.retries;
                if give_up {
                    error!("Giving up on {}: {}", task.src_key, e);
                    ctx.stats.record_failure(task.src_key.as_str(), &e);
                    return TaskOutcome::Failed;
                }
                object_attempt += 1;
                warn!(
                    "Transfer of {} failed, redoing object (attempt {}): {}",
                    task.src_key, object_attempt, e
                );
                let delay = ctx.retry.backoff_delay(object_attempt);
                tokio::select! {
                    _ = ctx.sleeper.sleep(delay) => {}
                    _ = ctx.cancel.cancelled() => return TaskOutcome::Cancelled,
                }
            }
        }
    }
}

/// One full attempt at the object: transfer plus post-transfer verification.
async fn copy_object(
    ctx: &Arc<RunContext>,
    source: &Arc<dyn StoreClient>,
    dest: &Arc<dyn StoreClient>,
    task: &TransferTask,
    options: &CopyOptions,
) -> Result<u64> {
    let size = task.meta.size;
    if size >= options.chunk_size {
        copy_multipart(ctx, source, dest, task, options).await?;
    } else {
        copy_single(ctx, source, dest, task).await?;
    }
    verify(ctx, dest, task).await?;
    Ok(size)
}

/// Single-shot get → put for objects below the chunk threshold.
async fn copy_single(
    ctx: &Arc<RunContext>,
    source: &Arc<dyn StoreClient>,
    dest: &Arc<dyn StoreClient>,
    task: &TransferTask,
) -> Result<()> {
    let data = ctx
        .remote("download", || {
            let source = source.clone();
            let key = task.src_key.clone();
            async move { source.get(key.as_str()).await }
        })
        .await?;

    ctx.remote("upload", || {
        let dest = dest.clone();
        let key = task.dest_key.clone();
        let data = data.clone();
        async move { dest.put(key.as_str(), data).await }
    })
    .await?;

    Ok(())
}

/// Chunked transfer through a multipart upload. A failed or cancelled
/// attempt always aborts the upload so the destination is left either
/// complete or clean.
async fn copy_multipart(
    ctx: &Arc<RunContext>,
    source: &Arc<dyn StoreClient>,
    dest: &Arc<dyn StoreClient>,
    task: &TransferTask,
    options: &CopyOptions,
) -> Result<()> {
    let plan = ChunkPlan::build(task.meta.size, options.chunk_size);
    debug!(
        "Copying {} as {} parts of up to {} bytes",
        task.src_key,
        plan.part_count(),
        options.chunk_size
    );

    let mut upload = ctx
        .remote("create upload", || {
            let dest = dest.clone();
            let key = task.dest_key.clone();
            async move { dest.start_multipart(key.as_str()).await }
        })
        .await?;

    let outcome = transfer_and_complete(ctx, source, task, &plan, upload.as_mut(), options).await;
    if let Err(e) = outcome {
        // Any failure short of a confirmed commit must leave the
        // destination clean rather than holding an incomplete upload.
        if let Err(abort_err) = upload.abort().await {
            warn!(
                "Failed to abort multipart upload for {}: {}",
                task.dest_key, abort_err
            );
        }
        return Err(e);
    }
    Ok(())
}

async fn transfer_and_complete(
    ctx: &Arc<RunContext>,
    source: &Arc<dyn StoreClient>,
    task: &TransferTask,
    plan: &ChunkPlan,
    upload: &mut dyn PartUpload,
    options: &CopyOptions,
) -> Result<()> {
    stream_parts(ctx, source, task, plan, upload, options).await?;
    if let Some(limiter) = &ctx.limiter {
        limiter.acquire(&ctx.cancel).await?;
    }
    upload.complete().await
}

/// Pipeline part downloads into part uploads.
///
/// Downloads run `upload_concurrency` wide but complete in range order, so
/// part indices assigned by `put_part` call order line up with the plan;
/// at most `upload_concurrency` part uploads are awaited concurrently.
async fn stream_parts(
    ctx: &Arc<RunContext>,
    source: &Arc<dyn StoreClient>,
    task: &TransferTask,
    plan: &ChunkPlan,
    upload: &mut dyn PartUpload,
    options: &CopyOptions,
) -> Result<()> {
    let downloads = stream::iter(plan.ranges().to_vec())
        .map(|range| {
            let ctx = ctx.clone();
            let source = source.clone();
            let key = task.src_key.clone();
            async move {
                ctx.remote("download part", || {
                    let source = source.clone();
                    let key = key.clone();
                    let range = range.clone();
                    async move { source.get_range(key.as_str(), range).await }
                })
                .await
            }
        })
        .buffered(options.upload_concurrency);
    futures::pin_mut!(downloads);

    let mut in_flight: FuturesUnordered<_> = FuturesUnordered::new();
    while let Some(data) = downloads.next().await {
        let data: Bytes = data?;
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(limiter) = &ctx.limiter {
            limiter.acquire(&ctx.cancel).await?;
        }
        in_flight.push(upload.put_part(data));
        while in_flight.len() >= options.upload_concurrency {
            in_flight
                .next()
                .await
                .expect("in_flight is non-empty here")?;
        }
    }
    while let Some(result) = in_flight.next().await {
        result?;
    }
    Ok(())
}

/// Confirm the destination agrees with what was planned.
async fn verify(
    ctx: &Arc<RunContext>,
    dest: &Arc<dyn StoreClient>,
    task: &TransferTask,
) -> Result<()> {
    let written = ctx
        .remote("verify", || {
            let dest = dest.clone();
            let key = task.dest_key.clone();
            async move { dest.head(key.as_str()).await }
        })
        .await?;

    if written.size != task.meta.size {
        return Err(Error::Integrity {
            key: task.dest_key.as_str().to_string(),
            detail: format!(
                "destination reports {} bytes, source has {}",
                written.size, task.meta.size
            ),
        });
    }
    Ok(())
}
