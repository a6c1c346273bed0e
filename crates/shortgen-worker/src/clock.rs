//! Sleep abstraction.
//!
//! Every wait in a run (rate-limit backoff, run retries, request cooldown)
//! goes through a [`Sleeper`] so the policies can be tested without delay.

use std::time::Duration;

use async_trait::async_trait;

/// Pauses the single execution thread.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
