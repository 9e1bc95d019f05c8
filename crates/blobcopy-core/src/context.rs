//! Shared per-run state.
//!
//! Everything a worker needs — counters, the rate limiter, the cancellation
//! signal and the retry policy — is owned by one [`RunContext`] constructed
//! at run start and passed down explicitly. There are no process-wide
//! singletons.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::clock::{Sleeper, TokioSleeper};
use crate::config::CopyOptions;
use crate::limiter::TokenBucket;
use crate::retry::{with_retries, RetryPolicy};
use crate::stats::RunStats;
use crate::Result;

/// State shared by every component of one run.
pub struct RunContext {
    pub stats: Arc<RunStats>,
    pub limiter: Option<Arc<TokenBucket>>,
    pub cancel: CancelToken,
    pub sleeper: Arc<dyn Sleeper>,
    pub retry: RetryPolicy,
}

impl RunContext {
    pub fn new(options: &CopyOptions) -> Arc<Self> {
        Arc::new(Self {
            stats: Arc::new(RunStats::new()),
            limiter: options.rate_limit.map(|limit| Arc::new(TokenBucket::new(limit))),
            cancel: CancelToken::new(),
            sleeper: Arc::new(TokioSleeper),
            retry: RetryPolicy {
                low_level_retries: options.low_level_retries,
                base_delay: Duration::from_millis(options.retry_sleep_ms),
                ..Default::default()
            },
        })
    }

    /// Issue one remote operation under the run's rate limiter, retry policy
    /// and cancellation signal.
    ///
    /// The closure is invoked once per attempt and must return an owned
    /// future (clone captured handles into it).
    pub async fn remote<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retries(
            &self.retry,
            self.sleeper.as_ref(),
            &self.cancel,
            self.limiter.as_deref(),
            op_name,
            op,
        )
        .await
    }
}
