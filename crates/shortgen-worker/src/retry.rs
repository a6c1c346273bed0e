//! Run-level retry.
//!
//! Re-invokes a whole step (generate, parse, write) after a fixed pause when
//! it fails with a retryable error. This sits above the generation client's
//! own 429 backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Sleeper;
use crate::error::WorkerResult;

/// Configuration for run-level retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub interval: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(30),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the total number of attempts (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Execute an async step, retrying retryable errors after a fixed pause.
///
/// Non-retryable errors and the error of the last attempt are returned as-is.
pub async fn retry_async<F, Fut, T>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    operation: F,
) -> WorkerResult<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = WorkerResult<T>>,
{
    let mut attempt = 1u32;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "{} succeeded on attempt {}",
                        config.operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = config.interval.as_millis() as u64,
                    "{} failed, retrying: {}",
                    config.operation_name,
                    e
                );
                sleeper.sleep(config.interval).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
