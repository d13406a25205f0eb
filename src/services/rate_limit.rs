//! Global serializer for outbound provider calls.
//!
//! Every embedding and rerank request passes through one injected
//! [`RateLimiter`], which bounds in-flight calls and enforces a minimum
//! spacing between dispatches. Constructed explicitly and shared via `Arc`;
//! there is no ambient global.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::models::RateLimitConfig;

/// Bounds outbound provider calls to `max_concurrent_requests` in flight and
/// spaces dispatches at least `min_interval_ms` apart.
#[derive(Debug)]
pub struct RateLimiter {
    semaphore: Semaphore,
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent_requests.max(1)),
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&RateLimitConfig::default())
    }

    /// Wait for permission to issue one provider call. Waiters are released
    /// in FIFO order. The returned permit must be held for the duration of
    /// the call; dropping it frees the slot for the next waiter.
    pub async fn acquire(&self) -> RatePermit<'_> {
        // The semaphore is never closed, so acquire cannot fail
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("rate limiter semaphore closed");

        // The spacing lock is held across the sleep so concurrent holders
        // (capacity > 1) still dispatch min_interval apart.
        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());

        RatePermit { _permit: permit }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Permission for one in-flight provider call. Releasing is the drop, which
/// runs on every exit path including errors.
#[derive(Debug)]
pub struct RatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}
