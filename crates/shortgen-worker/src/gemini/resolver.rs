//! Model selection from the live catalog.

use tracing::{info, warn};

use super::transport::{GeminiTransport, ModelInfo};

/// Newest-preferred version tags.
pub const DEFAULT_PREFERENCES: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"];

/// Used when the catalog cannot be read.
pub const FALLBACK_MODEL: &str = "gemini-2.0-flash";

/// Picks a generation model. Never fails: catalog problems degrade to
/// [`FALLBACK_MODEL`].
#[derive(Debug, Clone)]
pub struct ModelResolver {
    preferences: Vec<String>,
    fallback: String,
}

impl Default for ModelResolver {
    fn default() -> Self {
        Self {
            preferences: DEFAULT_PREFERENCES.iter().map(|s| s.to_string()).collect(),
            fallback: FALLBACK_MODEL.to_string(),
        }
    }
}

impl ModelResolver {
    pub fn new(preferences: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            preferences,
            fallback: fallback.into(),
        }
    }

    /// Choose from a catalog: the first generation-capable model containing
    /// the highest-priority tag, else any generation-capable model.
    pub fn choose(&self, models: &[ModelInfo]) -> Option<String> {
        let capable: Vec<&str> = models
            .iter()
            .filter(|m| m.supports_generation())
            .map(ModelInfo::short_name)
            .collect();

        self.preferences
            .iter()
            .find_map(|tag| capable.iter().find(|name| name.contains(tag.as_str())))
            .or_else(|| capable.first())
            .map(|name| name.to_string())
    }

    /// Resolve against the transport's catalog.
    pub async fn resolve(&self, transport: &dyn GeminiTransport) -> String {
        match transport.list_models().await {
            Ok(models) => match self.choose(&models) {
                Some(model) => {
                    info!(model = %model, available = models.len(), "Resolved generation model");
                    model
                }
                None => {
                    warn!(
                        fallback = %self.fallback,
                        "Model catalog has no generation-capable model, using fallback"
                    );
                    self.fallback.clone()
                }
            },
            Err(e) => {
                warn!(
                    fallback = %self.fallback,
                    "Model catalog unavailable, using fallback: {}", e
                );
                self.fallback.clone()
            }
        }
    }
}
