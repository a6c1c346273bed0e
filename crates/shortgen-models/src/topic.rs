//! Topic model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A short theme string driving one generation cycle.
///
/// Topics are either pre-seeded by an operator or synthesized by the model.
/// A synthesized topic is never empty; [`Topic::new`] rejects blank input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Create a topic, returning `None` when the trimmed value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Wrap a value read verbatim from the store.
    ///
    /// Operator-seeded rows are returned as-is, including blank cells.
    pub fn verbatim(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the topic has no visible content.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_new_trims() {
        let topic = Topic::new("  踊る猫  ").unwrap();
        assert_eq!(topic.as_str(), "踊る猫");
    }

    #[test]
    fn test_topic_new_rejects_blank() {
        assert!(Topic::new("").is_none());
        assert!(Topic::new("   \n").is_none());
    }

    #[test]
    fn test_topic_verbatim_keeps_value() {
        let topic = Topic::verbatim(" raw ");
        assert_eq!(topic.as_str(), " raw ");
        assert!(!topic.is_blank());
        assert!(Topic::verbatim("").is_blank());
    }
}
