//! Work selection: next unprocessed row, or a freshly synthesized topic.

use shortgen_models::{ColumnMap, ContentField, Topic, WorkStatus};
use shortgen_sheets::RowStore;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::gemini::GenerationClient;
use crate::metrics::record_topic_synthesized;
use crate::prompts::{build_topic_prompt, DEFAULT_DOMAIN_CONCEPT};

/// Label prefixes models like to put in front of the topic.
const LABEL_PREFIXES: &[&str] = &["テーマ:", "テーマ：", "Theme:", "theme:", "Topic:", "topic:"];

/// Decorative quote brackets.
const QUOTE_CHARS: &[char] = &['「', '」', '『', '』', '"', '“', '”'];

/// A selected work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTopic {
    pub row: u32,
    pub topic: Topic,
    /// True if the row was appended by this call.
    pub synthesized: bool,
}

/// Selects the next row to process.
pub struct TopicQueue<'a> {
    store: &'a dyn RowStore,
    columns: &'a ColumnMap,
    client: &'a GenerationClient,
    trend_instruction: &'a str,
    concept: &'a str,
    history_window: usize,
    synth_attempts: u32,
}

impl<'a> TopicQueue<'a> {
    pub fn new(
        store: &'a dyn RowStore,
        columns: &'a ColumnMap,
        client: &'a GenerationClient,
        trend_instruction: &'a str,
    ) -> Self {
        Self {
            store,
            columns,
            client,
            trend_instruction,
            concept: DEFAULT_DOMAIN_CONCEPT,
            history_window: 6,
            synth_attempts: 3,
        }
    }

    pub fn with_concept(mut self, concept: &'a str) -> Self {
        self.concept = concept;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_synth_attempts(mut self, attempts: u32) -> Self {
        self.synth_attempts = attempts.max(1);
        self
    }

    /// First `UNPROCESSED` row, or a new row with a synthesized topic.
    pub async fn next_topic(&self) -> WorkerResult<QueuedTopic> {
        let topic_col = self.required(ContentField::Topic)?;
        let status_col = self.required(ContentField::Status)?;

        if let Some(row) = self
            .store
            .find_row(status_col, WorkStatus::Unprocessed.as_str())
            .await?
        {
            let value = self.store.read_cell(row, topic_col).await?.unwrap_or_default();
            let topic = Topic::verbatim(value);
            if topic.is_blank() {
                warn!(row, "Unprocessed row has an empty topic");
            }
            info!(row, topic = %topic, "Picked unprocessed row");
            return Ok(QueuedTopic {
                row,
                topic,
                synthesized: false,
            });
        }

        let values = self.store.column_values(topic_col).await?;
        let mut avoid = recent_history(&values, self.history_window);
        info!(history = avoid.len(), "No unprocessed row, synthesizing a topic");

        for attempt in 1..=self.synth_attempts {
            let prompt = build_topic_prompt(self.concept, self.trend_instruction, &avoid);
            let raw = self.client.generate(&prompt, true).await?;

            let topic = match Topic::new(sanitize_topic(&raw)) {
                Some(topic) => topic,
                None => {
                    warn!(attempt, "Synthesized topic is empty");
                    continue;
                }
            };

            if avoid.iter().any(|t| t == topic.as_str()) {
                warn!(attempt, topic = %topic, "Synthesized topic repeats a recent one");
                avoid.push(topic.into_inner());
                continue;
            }

            let row_values = self.columns.build_row(&[
                (ContentField::Topic, topic.as_str()),
                (ContentField::Status, WorkStatus::Unprocessed.as_str()),
            ]);
            let row = self.store.append_row(row_values).await?;
            record_topic_synthesized();
            info!(row, topic = %topic, attempt, "Appended synthesized topic");

            return Ok(QueuedTopic {
                row,
                topic,
                synthesized: true,
            });
        }

        Err(WorkerError::no_work_found(format!(
            "no usable topic after {} synthesis attempt(s)",
            self.synth_attempts
        )))
    }

    fn required(&self, field: ContentField) -> WorkerResult<u32> {
        self.columns.get(field).ok_or_else(|| {
            WorkerError::config_error(format!(
                "sheet header has no \"{}\" column",
                field.header_name()
            ))
        })
    }
}

/// Last `window` non-blank topics, header excluded.
pub fn recent_history(column: &[String], window: usize) -> Vec<String> {
    let topics: Vec<String> = column
        .iter()
        .skip(1)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    let start = topics.len().saturating_sub(window);
    topics[start..].to_vec()
}

/// Reduce a model answer to the topic: last non-empty line, without bold
/// markers, quote brackets or a label prefix.
pub fn sanitize_topic(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default();

    let mut topic: String = line
        .replace("**", "")
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c))
        .collect();

    for prefix in LABEL_PREFIXES {
        if let Some(rest) = topic.trim_start().strip_prefix(prefix) {
            topic = rest.to_string();
            break;
        }
    }

    topic.trim().to_string()
}
