//! Short-form video content generation worker.
//!
//! This crate provides:
//! - Gemini transport, model resolution and the retry/fallback generation client
//! - Trend directive resolution from the trend cell
//! - The topic queue (select or synthesize the next work item)
//! - Delimited response parsing with degraded defaults
//! - Result writing and one-shot pipeline orchestration

pub mod clock;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod topic_queue;
pub mod trend;
pub mod writer;

pub use clock::{Sleeper, TokioSleeper};
pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use gemini::{GenerationClient, GenerationPolicy, HttpGeminiTransport, ModelResolver};
pub use logging::RunLogger;
pub use parser::{ContentParser, ContentSchema, ParsedContent};
pub use pipeline::{Pipeline, RunContext, RunOutcome};
pub use topic_queue::{QueuedTopic, TopicQueue};
pub use writer::ResultWriter;
