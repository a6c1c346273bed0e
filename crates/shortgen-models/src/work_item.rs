//! Work item (sheet row) models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing status of a work item.
///
/// Stored in the sheet as the literal sentinels `UNPROCESSED`, `PROCESSED`
/// and `ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    /// Topic filled, content not generated yet
    #[default]
    Unprocessed,
    /// All content fields written
    Processed,
    /// Generation failed terminally (only written when error marking is enabled)
    Error,
}

impl WorkStatus {
    /// Get the sentinel stored in the status cell.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Unprocessed => "UNPROCESSED",
            WorkStatus::Processed => "PROCESSED",
            WorkStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "UNPROCESSED" => Ok(WorkStatus::Unprocessed),
            "PROCESSED" => Ok(WorkStatus::Processed),
            "ERROR" => Ok(WorkStatus::Error),
            other => Err(format!("unknown work status: {}", other)),
        }
    }
}

/// Semantic fields of a work item, each bound to one sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentField {
    Topic,
    Status,
    Script,
    VideoPrompt,
    Caption,
    AudioPrompt,
}

impl ContentField {
    /// All fields in sheet order.
    pub const ALL: [ContentField; 6] = [
        ContentField::Topic,
        ContentField::Status,
        ContentField::Script,
        ContentField::VideoPrompt,
        ContentField::Caption,
        ContentField::AudioPrompt,
    ];

    /// Header name used to locate the column (exact match).
    pub fn header_name(&self) -> &'static str {
        match self {
            ContentField::Topic => "Topic",
            ContentField::Status => "Status",
            ContentField::Script => "Script",
            ContentField::VideoPrompt => "Prompt",
            ContentField::Caption => "Caption",
            ContentField::AudioPrompt => "Audio",
        }
    }
}

impl fmt::Display for ContentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header_name())
    }
}
