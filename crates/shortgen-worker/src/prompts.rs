//! Prompt construction.

use shortgen_models::ContentField;

use crate::parser::ContentSchema;

/// Channel concept used when `SHORTGEN_DOMAIN_CONCEPT` is not set.
pub const DEFAULT_DOMAIN_CONCEPT: &str = "A short-form vertical video channel (YouTube Shorts, \
TikTok, Reels) posting surprising, funny and heartwarming 15-60 second clips \
for a Japanese-speaking audience";

/// Prompt asking for one fresh topic.
pub fn build_topic_prompt(concept: &str, trend_instruction: &str, avoid: &[String]) -> String {
    let avoid_block = if avoid.is_empty() {
        "(none yet)".to_string()
    } else {
        avoid
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You plan topics for this channel:
{concept}

Trend guidance: {trend_instruction}

Topics already used (do not repeat or closely paraphrase any of them):
{avoid_block}

Propose exactly ONE new topic for the next short video.
Rules:
- A single short phrase, in Japanese
- No explanation, numbering, quotes or markdown
- Put the topic alone on the last line of your answer
"#
    )
}

/// Prompt asking for the content fields of `topic`, separated per `schema`.
pub fn build_content_prompt(
    topic: &str,
    concept: &str,
    trend_instruction: &str,
    schema: &ContentSchema,
) -> String {
    let sections = schema
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| format!("{}. {}", i + 1, field_instruction(*field)))
        .collect::<Vec<_>>()
        .join("\n");

    let layout = schema
        .fields
        .iter()
        .map(|field| format!("<{}>", field.header_name()))
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n", schema.delimiter));

    format!(
        r#"You write short-form vertical videos for this channel:
{concept}

Topic: {topic}

Trend guidance: {trend_instruction}

Write the following {count} sections, in this order:
{sections}

Separate the sections with a line containing only {delimiter}. Output nothing
before the first section and nothing after the last one, like this:
{layout}
"#,
        count = schema.expected_fields(),
        delimiter = schema.delimiter,
    )
}

fn field_instruction(field: ContentField) -> &'static str {
    match field {
        ContentField::Script => {
            "Script: the narration and on-screen text, in Japanese, with a strong hook in the first line"
        }
        ContentField::VideoPrompt => {
            "Prompt: one English paragraph describing the visuals for a video generation model \
             (subject, setting, camera, lighting, style), vertical 9:16"
        }
        ContentField::Caption => "Caption: a one-line post caption followed by 3-6 hashtags",
        ContentField::AudioPrompt => {
            "Audio: one English sentence describing background music or sound for the clip"
        }
        ContentField::Topic | ContentField::Status => "",
    }
}
