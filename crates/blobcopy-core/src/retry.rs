//! Retry policy with exponential backoff for remote operations.
//!
//! Every adapter call goes through [`with_retries`]: transient failures are
//! retried with capped exponential backoff and jitter, permanent failures
//! surface immediately, and cancellation aborts both the operation and any
//! in-progress backoff sleep.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::clock::Sleeper;
use crate::error::{Error, ErrorClass, Result};
use crate::limiter::TokenBucket;

/// Retry configuration for individual remote calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub low_level_retries: u32,
    /// Backoff for the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            low_level_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based): base × 2^attempt,
    /// capped, with ±20% jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let capped = exp.min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        capped.mul_f64(jitter)
    }
}

/// Run `op` until it succeeds, fails permanently, exhausts the retry budget,
/// or the run is cancelled.
///
/// When a rate limiter is supplied, a token is taken before every attempt so
/// retries are throttled the same as first attempts. The closure must return
/// an owned future (clone what it needs); it is invoked once per attempt.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    limiter: Option<&TokenBucket>,
    op_name: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(bucket) = limiter {
            bucket.acquire(cancel).await?;
        }

        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", op_name, attempt);
                }
                return Ok(value);
            }
            Err(e) => match e.class() {
                ErrorClass::Permanent | ErrorClass::Cancelled => return Err(e),
                ErrorClass::Transient => {
                    if attempt >= policy.low_level_retries {
                        warn!("{} failed after {} attempts: {}", op_name, attempt + 1, e);
                        return Err(e);
                    }
                    let delay = policy.backoff_delay(attempt);
                    debug!(
                        "{} failed (attempt {}), retrying in {:?}: {}",
                        op_name,
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::select! {
                        _ = sleeper.sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                    }
                    attempt += 1;
                }
            },
        }
    }
}
