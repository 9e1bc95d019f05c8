//! Token-bucket rate limiting for remote API calls.
//!
//! One bucket is shared by every component of a run; each remote call takes
//! one token. The bucket allows a burst up to its capacity and refills at a
//! fixed rate, so sustained call rate converges to the configured
//! requests-per-second.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::clock::{Clock, Sleeper, SystemClock, TokioSleeper};
use crate::error::{Error, Result};

/// Rate limit configuration: steady-state requests per second plus the burst
/// the bucket may absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimit {
    /// Sustained requests per second.
    pub rps: u32,
    /// Maximum tokens the bucket can hold.
    pub burst: u32,
}

struct BucketState {
    tokens: f64,
    refreshed: Instant,
}

/// Shared token bucket.
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl TokenBucket {
    /// Create a bucket running on real time. Starts full.
    pub fn new(limit: RateLimit) -> Self {
        Self::with_parts(limit, Arc::new(SystemClock), Arc::new(TokioSleeper))
    }

    /// Create a bucket with an injected clock and sleeper.
    pub fn with_parts(limit: RateLimit, clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        let capacity = f64::from(limit.burst.max(1));
        Self {
            rate: f64::from(limit.rps.max(1)),
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                refreshed: clock.now(),
            }),
            clock,
            sleeper,
        }
    }

    /// Take one token, waiting for refill if the bucket is empty. The wait is
    /// abandoned as soon as the run is cancelled.
    pub async fn acquire(&self, cancel: &CancelToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.try_take() {
                None => return Ok(()),
                Some(wait) => {
                    tokio::select! {
                        _ = self.sleeper.sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                    }
                }
            }
        }
    }

    /// Take a token if one is available, otherwise report how long until the
    /// next token lands.
    fn try_take(&self) -> Option<Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let elapsed = now.saturating_duration_since(state.refreshed);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        state.refreshed = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - state.tokens;
            Some(Duration::from_secs_f64(deficit / self.rate))
        }
    }

    #[cfg(test)]
    fn available(&self) -> f64 {
        self.state.lock().tokens
    }
}
