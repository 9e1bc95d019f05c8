//! Run-wide counters and progress reporting.
//!
//! Workers update independent atomics; the reporter samples them into a
//! consistent-enough snapshot without taking any lock a worker contends on.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::cancel::CancelToken;

/// One failed object, kept for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct TransferFailure {
    /// Source key of the object that failed.
    pub key: String,
    /// Final error, stringified.
    pub error: String,
}

/// Process-wide counters for one run.
pub struct RunStats {
    /// Candidates produced by enumeration so far.
    pub objects_found: AtomicU64,
    /// Objects confirmed written to the destination.
    pub objects_done: AtomicU64,
    /// Objects that exhausted their retry budget or failed permanently.
    pub objects_failed: AtomicU64,
    /// Objects skipped as already identical.
    pub objects_skipped: AtomicU64,
    /// Payload bytes confirmed at the destination.
    pub bytes_copied: AtomicU64,
    in_flight: AtomicU64,
    listing_complete: AtomicBool,
    failures: Mutex<Vec<TransferFailure>>,
    start: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            objects_found: AtomicU64::new(0),
            objects_done: AtomicU64::new(0),
            objects_failed: AtomicU64::new(0),
            objects_skipped: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            listing_complete: AtomicBool::new(false),
            failures: Mutex::new(Vec::new()),
            start: Instant::now(),
        }
    }

    pub fn record_found(&self, count: u64) {
        self.objects_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_done(&self, bytes: u64) {
        self.objects_done.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.objects_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, key: &str, error: &crate::error::Error) {
        self.objects_failed.fetch_add(1, Ordering::Relaxed);
        self.failures.lock().push(TransferFailure {
            key: key.to_string(),
            error: error.to_string(),
        });
    }

    pub fn begin_transfer(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_transfer(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Flag that enumeration finished, making `objects_found` a final total.
    pub fn mark_listing_complete(&self) {
        self.listing_complete.store(true, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Sample the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            objects_found: self.objects_found.load(Ordering::Relaxed),
            objects_done: self.objects_done.load(Ordering::Relaxed),
            objects_failed: self.objects_failed.load(Ordering::Relaxed),
            objects_skipped: self.objects_skipped.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            listing_complete: self.listing_complete.load(Ordering::Relaxed),
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }

    /// Freeze the counters into the final run report.
    pub fn report(&self, aborted: bool, listing_error: Option<String>) -> RunReport {
        RunReport {
            snapshot: self.snapshot(),
            duration_secs: self.elapsed().as_secs_f64(),
            failures: self.failures.lock().clone(),
            aborted,
            listing_error,
        }
    }
}

/// Point-in-time view of [`RunStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub objects_found: u64,
    pub objects_done: u64,
    pub objects_failed: u64,
    pub objects_skipped: u64,
    pub bytes_copied: u64,
    pub in_flight: u64,
    pub listing_complete: bool,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.bytes_copied as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Seconds until completion, only meaningful once the total is known.
    pub fn eta_secs(&self) -> Option<f64> {
        if !self.listing_complete {
            return None;
        }
        let settled = self.objects_done + self.objects_failed + self.objects_skipped;
        let remaining = self.objects_found.saturating_sub(settled);
        if remaining == 0 || settled == 0 {
            return Some(0.0);
        }
        let per_object = self.elapsed_secs / settled as f64;
        Some(per_object * remaining as f64)
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = if self.listing_complete {
            format!("{}", self.objects_found)
        } else {
            format!("{}+", self.objects_found)
        };
        write!(
            f,
            "{}/{} objects done, {} skipped, {} failed, {} ({}/s), {} in flight",
            self.objects_done,
            total,
            self.objects_skipped,
            self.objects_failed,
            fmt_bytes(self.bytes_copied),
            fmt_bytes(self.bytes_per_sec() as u64),
            self.in_flight,
        )?;
        if let Some(eta) = self.eta_secs() {
            write!(f, ", eta {:.0}s", eta)?;
        }
        Ok(())
    }
}

/// Final summary for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub snapshot: StatsSnapshot,
    pub duration_secs: f64,
    pub failures: Vec<TransferFailure>,
    /// True when the run was cancelled before draining the work queue.
    pub aborted: bool,
    /// Set when enumeration ended early on a permanent listing error.
    pub listing_error: Option<String>,
}

impl RunReport {
    /// True when every enumerated object reached a successful terminal state.
    pub fn fully_successful(&self) -> bool {
        !self.aborted && self.listing_error.is_none() && self.failures.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Transfer Summary ===")?;
        writeln!(f, "Duration: {:.2}s", self.duration_secs)?;
        writeln!(f, "Objects copied: {}", self.snapshot.objects_done)?;
        writeln!(f, "Objects skipped: {}", self.snapshot.objects_skipped)?;
        writeln!(f, "Objects failed: {}", self.snapshot.objects_failed)?;
        writeln!(
            f,
            "Bytes copied: {} ({}/s)",
            fmt_bytes(self.snapshot.bytes_copied),
            fmt_bytes(self.snapshot.bytes_per_sec() as u64)
        )?;
        if self.aborted {
            writeln!(f, "Run aborted before completion")?;
        }
        if let Some(err) = &self.listing_error {
            writeln!(f, "Enumeration ended early: {}", err)?;
        }
        for failure in &self.failures {
            writeln!(f, "  failed: {} ({})", failure.key, failure.error)?;
        }
        Ok(())
    }
}

/// Log a progress line every `interval` until the run ends.
pub async fn report_progress(stats: Arc<RunStats>, interval: Duration, cancel: CancelToken) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                info!("{}", stats.snapshot());
            }
            _ = cancel.cancelled() => return,
        }
    }
}

fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
