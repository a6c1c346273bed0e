//! Pipeline configuration.

use std::str::FromStr;
use std::time::Duration;

use shortgen_models::CellRef;

use crate::error::{WorkerError, WorkerResult};
use crate::gemini::GenerationPolicy;
use crate::prompts::DEFAULT_DOMAIN_CONCEPT;
use crate::retry::RetryConfig;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API access.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Skips catalog resolution when set
    pub model_override: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_override", &self.model_override)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model_override: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_env() -> WorkerResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| WorkerError::config_error("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            model_override: std::env::var("GEMINI_MODEL")
                .ok()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            timeout: Duration::from_secs(env_or("GEMINI_TIMEOUT_SECS", 120)),
        })
    }
}

/// Everything one run needs besides the store handle.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gemini: GeminiConfig,
    pub generation: GenerationPolicy,
    /// Cell holding the trend directive
    pub trend_cell: CellRef,
    pub domain_concept: String,
    /// Recent topics the synthesis prompt must avoid
    pub history_window: usize,
    pub topic_synth_attempts: u32,
    /// Outer retry around generate + parse + write
    pub run_retry: RetryConfig,
    /// Pause between the topic call and the content call
    pub request_cooldown: Duration,
    /// Write `ERROR` to the row on terminal failure
    pub mark_errors: bool,
}

impl PipelineConfig {
    /// Defaults around an explicit Gemini config.
    pub fn new(gemini: GeminiConfig) -> Self {
        Self {
            gemini,
            generation: GenerationPolicy::default(),
            trend_cell: CellRef::new(2, 8),
            domain_concept: DEFAULT_DOMAIN_CONCEPT.to_string(),
            history_window: 6,
            topic_synth_attempts: 3,
            run_retry: RetryConfig::new("content_generation"),
            request_cooldown: Duration::from_secs(5),
            mark_errors: false,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let gemini = GeminiConfig::from_env()?;

        let trend_cell = match std::env::var("SHORTGEN_TREND_CELL") {
            Ok(value) => value.trim().parse::<CellRef>().map_err(|e| {
                WorkerError::config_error(format!("SHORTGEN_TREND_CELL: {}", e))
            })?,
            Err(_) => CellRef::new(2, 8),
        };

        let generation = GenerationPolicy {
            max_attempts: env_or("GEMINI_MAX_ATTEMPTS", 5u32).max(1),
            backoff_base: Duration::from_secs(env_or("GEMINI_BACKOFF_BASE_SECS", 10)),
            backoff_step: Duration::from_secs(env_or("GEMINI_BACKOFF_STEP_SECS", 10)),
            fallback_after_attempts: std::env::var("GEMINI_FALLBACK_AFTER_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        let run_retry = RetryConfig::new("content_generation")
            .with_max_attempts(env_or("SHORTGEN_RUN_ATTEMPTS", 3))
            .with_interval(Duration::from_secs(env_or("SHORTGEN_RUN_RETRY_SECS", 30)));

        Ok(Self {
            gemini,
            generation,
            trend_cell,
            domain_concept: std::env::var("SHORTGEN_DOMAIN_CONCEPT")
                .ok()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DOMAIN_CONCEPT.to_string()),
            history_window: env_or("SHORTGEN_HISTORY_WINDOW", 6),
            topic_synth_attempts: env_or("SHORTGEN_TOPIC_SYNTH_ATTEMPTS", 3u32).max(1),
            run_retry,
            request_cooldown: Duration::from_secs(env_or("SHORTGEN_REQUEST_COOLDOWN_SECS", 5)),
            mark_errors: std::env::var("SHORTGEN_MARK_ERRORS")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
