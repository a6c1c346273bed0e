//! Retry for idempotent Sheets calls.
//!
//! Reads and single-cell updates can be repeated safely. Appends cannot and
//! never go through [`with_retry`]. Quota errors wait exactly as long as the
//! API's `Retry-After` asks; other transient failures back off exponentially
//! with jitter.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::SheetsResult;
use crate::metrics::record_retry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Repeats after the first call.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Cap on the computed backoff. A `Retry-After` hint is not capped.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Read `SHEETS_RETRY_MAX`, `SHEETS_RETRY_BASE_MS` and `SHEETS_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            max_retries: std::env::var("SHEETS_RETRY_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay: millis("SHEETS_RETRY_BASE_MS", defaults.base_delay),
            max_delay: millis("SHEETS_RETRY_MAX_MS", defaults.max_delay),
        }
    }

    /// Backoff before repeat number `retry` (1-based): half of
    /// `base * 2^(retry-1)` fixed, the other half jittered, all capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let ceiling = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let half = ceiling / 2;
        half + half.mul_f64(jitter_fraction())
    }
}

/// Pseudo-random fraction in [0, 1) from the clock's sub-second part.
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Run an idempotent store call, repeating it on transient failures.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> SheetsResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = SheetsResult<T>>,
{
    let mut retry = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !err.is_retryable() || retry >= config.max_retries {
            return Err(err);
        }

        retry += 1;
        let delay = err.retry_after().unwrap_or_else(|| config.backoff(retry));
        warn!(
            operation = %operation,
            retry,
            max_retries = config.max_retries,
            delay_ms = delay.as_millis() as u64,
            "Sheets call failed, retrying: {}",
            err
        );
        record_retry(operation);
        tokio::time::sleep(delay).await;
    }
}
