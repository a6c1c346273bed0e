//! One-shot pipeline: pick or synthesize a topic, generate its content and
//! write it back.

use std::sync::Arc;

use shortgen_models::{ColumnMap, ContentPackage, Topic, TrendDirective};
use shortgen_sheets::RowStore;
use tracing::{info, warn, Instrument};

use crate::clock::{Sleeper, TokioSleeper};
use crate::config::PipelineConfig;
use crate::error::WorkerResult;
use crate::gemini::{GeminiTransport, GenerationClient, ModelResolver};
use crate::logging::RunLogger;
use crate::metrics::record_run;
use crate::parser::{ContentParser, ContentSchema};
use crate::prompts::build_content_prompt;
use crate::retry::retry_async;
use crate::topic_queue::TopicQueue;
use crate::trend;
use crate::writer::ResultWriter;

/// Per-run state, resolved once at the start of a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub model: String,
    pub columns: ColumnMap,
    pub trend: TrendDirective,
    pub trend_instruction: String,
    pub schema: ContentSchema,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub row: u32,
    pub topic: Topic,
    /// The content response ignored the delimiter format.
    pub degraded: bool,
    /// The row was appended by this run.
    pub synthesized: bool,
    pub model: String,
}

pub struct Pipeline {
    store: Arc<dyn RowStore>,
    transport: Arc<dyn GeminiTransport>,
    sleeper: Arc<dyn Sleeper>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RowStore>,
        transport: Arc<dyn GeminiTransport>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            transport,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve the column map, trend directive and model.
    pub async fn prepare(&self) -> WorkerResult<RunContext> {
        let header = self.store.header().await?;
        let columns = ColumnMap::from_header(&header);

        let cell = self.config.trend_cell;
        let raw_trend = self.store.read_cell(cell.row, cell.column).await?;
        let trend = trend::resolve(raw_trend.as_deref());
        let trend_instruction = trend::instruction(&trend);

        let model = match &self.config.gemini.model_override {
            Some(model) => {
                info!(model = %model, "Using configured model");
                model.clone()
            }
            None => ModelResolver::default().resolve(self.transport.as_ref()).await,
        };

        info!(
            model = %model,
            trend = %trend.label(),
            columns = header.len(),
            "Run context prepared"
        );

        Ok(RunContext {
            model,
            schema: ContentSchema::for_columns(&columns),
            columns,
            trend,
            trend_instruction,
        })
    }

    /// Process exactly one work item.
    pub async fn run_once(&self) -> WorkerResult<RunOutcome> {
        let logger = RunLogger::new();
        let span = logger.span();

        async {
            logger.started();

            let result = self.run_with(&logger).await;
            match &result {
                Ok(outcome) => {
                    record_run(if outcome.degraded { "degraded" } else { "success" });
                    logger.finished(outcome);
                }
                Err(e) => {
                    record_run("failed");
                    logger.failed(e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_with(&self, logger: &RunLogger) -> WorkerResult<RunOutcome> {
        let ctx = self.prepare().await?;
        let client = GenerationClient::new(
            self.transport.clone(),
            self.sleeper.clone(),
            ctx.model.clone(),
            self.config.generation.clone(),
        );

        let queued = TopicQueue::new(
            self.store.as_ref(),
            &ctx.columns,
            &client,
            &ctx.trend_instruction,
        )
        .with_concept(&self.config.domain_concept)
        .with_history_window(self.config.history_window)
        .with_synth_attempts(self.config.topic_synth_attempts)
        .next_topic()
        .await?;

        logger.selected(queued.row, queued.topic.as_str(), queued.synthesized);

        if queued.synthesized && !self.config.request_cooldown.is_zero() {
            info!(
                delay_ms = self.config.request_cooldown.as_millis() as u64,
                "Cooling down before content generation"
            );
            self.sleeper.sleep(self.config.request_cooldown).await;
        }

        let writer = ResultWriter::new(self.store.as_ref(), &ctx.columns);
        let parser = ContentParser::new(ctx.schema.clone());
        let prompt = build_content_prompt(
            queued.topic.as_str(),
            &self.config.domain_concept,
            &ctx.trend_instruction,
            &ctx.schema,
        );
        let grounded = ctx.trend.wants_search();
        let topic = queued.topic.as_str();
        let row = queued.row;

        let generated = retry_async(&self.config.run_retry, self.sleeper.as_ref(), |attempt| {
            let (client, parser, writer, prompt) = (&client, &parser, &writer, &prompt);
            async move {
                let raw = client.generate(prompt, grounded).await?;
                let parsed = parser.parse(&raw, topic);
                let package: ContentPackage = parsed.to_package(topic);
                writer.write(row, &package).await?;
                if attempt > 1 {
                    info!(row, attempt, "Content written after retry");
                }
                Ok(parsed.degraded)
            }
        })
        .await;

        let degraded = match generated {
            Ok(degraded) => degraded,
            Err(e) => {
                if self.config.mark_errors {
                    if let Err(mark_err) = writer.mark_error(row).await {
                        warn!(row, "Failed to mark row as ERROR: {}", mark_err);
                    }
                }
                return Err(e);
            }
        };

        Ok(RunOutcome {
            row: queued.row,
            topic: queued.topic.clone(),
            degraded,
            synthesized: queued.synthesized,
            model: ctx.model,
        })
    }
}
