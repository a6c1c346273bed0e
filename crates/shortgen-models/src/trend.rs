//! Trend directive model.

use serde::{Deserialize, Serialize};

/// Resolved steering instruction for how current trends influence generation.
///
/// Derived from the trend cell once per run; carries no persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "keyword", rename_all = "snake_case")]
pub enum TrendDirective {
    /// Search for the latest viral trends and incorporate them
    #[default]
    AutoSearch,
    /// Stay on the given topic, no external trends
    Disabled,
    /// Treat the operator-supplied value as the priority trend
    Keyword(String),
}

impl TrendDirective {
    /// Short label for logs.
    pub fn label(&self) -> &str {
        match self {
            TrendDirective::AutoSearch => "auto_search",
            TrendDirective::Disabled => "disabled",
            TrendDirective::Keyword(keyword) => keyword.as_str(),
        }
    }

    /// True when generation should be grounded with web retrieval.
    pub fn wants_search(&self) -> bool {
        !matches!(self, TrendDirective::Disabled)
    }
}
