//! Generated content package.

use serde::{Deserialize, Serialize};

/// The structured output of one content generation for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPackage {
    /// Narration / on-screen script
    pub script: String,
    /// Prompt for the video-generation model
    pub video_prompt: String,
    /// Caption with hashtags
    pub caption: String,
    /// Prompt for background audio, when the sheet has an audio column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_prompt: Option<String>,
}
