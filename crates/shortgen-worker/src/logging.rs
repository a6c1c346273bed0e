//! Per-run structured logging.
//!
//! The worker is invoked periodically; the run ID on the span ties together
//! the lines of one invocation.

use chrono::{DateTime, Utc};
use tracing::{error, info, Span};
use uuid::Uuid;

use crate::error::WorkerError;
use crate::pipeline::RunOutcome;

#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: Uuid,
    started_at: DateTime<Utc>,
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLogger {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Span every event of the run is recorded under.
    pub fn span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id)
    }

    pub fn started(&self) {
        info!(started_at = %self.started_at.to_rfc3339(), "Run started");
    }

    pub fn selected(&self, row: u32, topic: &str, synthesized: bool) {
        info!(row, topic, synthesized, "Work item selected");
    }

    pub fn finished(&self, outcome: &RunOutcome) {
        info!(
            row = outcome.row,
            topic = %outcome.topic,
            model = %outcome.model,
            degraded = outcome.degraded,
            synthesized = outcome.synthesized,
            elapsed_ms = self.elapsed_ms(),
            "Run completed"
        );
    }

    pub fn failed(&self, err: &WorkerError) {
        error!(
            elapsed_ms = self.elapsed_ms(),
            retryable = err.is_retryable(),
            "Run failed: {}",
            err
        );
    }

    /// Milliseconds since the run started.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
