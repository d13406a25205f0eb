//! Retry with exponential backoff for transient provider failures.
//!
//! The pipeline deliberately keeps retry out of the embedding client: the
//! orchestrator wraps each embedding batch in [`with_retry`] so the call site
//! knows which document and batch failed.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

/// Outcome of a retried operation, with the attempt count preserved so the
/// caller can account for retries in its task bookkeeping.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success { value: T, attempts: u32 },
    Failed { last_error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Convert to a plain Result, discarding the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }

    /// Number of attempts made, whether or not the operation succeeded.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Determines if an error is worth retrying.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        let msg = self.to_string().to_lowercase();
        msg.contains("timeout")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("service unavailable")
            || msg.contains("too many requests")
    }
}

/// Execute an async operation with exponential backoff retry. Non-retryable
/// errors fail immediately regardless of remaining attempts.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    let mut delay = config.initial_delay;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => return RetryResult::Success { value, attempts },
            Err(error) => {
                if attempts >= config.max_attempts || !error.is_retryable() {
                    return RetryResult::Failed {
                        last_error: error,
                        attempts,
                    };
                }

                // Jitter avoids retry storms lining up on the provider
                let jitter_ms = rand_jitter(delay.as_millis() as u64 / 4);
                sleep(delay + Duration::from_millis(jitter_ms)).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.multiplier)
                    .min(config.max_delay);
            }
        }
    }
}

/// Generate a pseudo-random jitter value. Not cryptographically secure, which
/// is fine for backoff spacing.
fn rand_jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    seed % max
}
