//! Delimited response parsing.
//!
//! The content prompt asks the model to separate fields with a delimiter
//! line. Responses that ignore the format still produce a usable package:
//! the leading text becomes the script and the other fields are filled from
//! topic-based templates.

use serde::{Deserialize, Serialize};
use shortgen_models::{ColumnMap, ContentField, ContentPackage, WorkStatus};
use tracing::warn;

use crate::metrics::record_degraded_parse;

/// Field delimiter of schema version 1.
pub const DEFAULT_DELIMITER: &str = "###";

/// Versioned field-separation protocol shared by the prompt and the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSchema {
    pub version: u32,
    pub delimiter: String,
    /// Fields in the order the model emits them.
    pub fields: Vec<ContentField>,
}

impl ContentSchema {
    pub fn v1(with_audio: bool) -> Self {
        let mut fields = vec![
            ContentField::Script,
            ContentField::VideoPrompt,
            ContentField::Caption,
        ];
        if with_audio {
            fields.push(ContentField::AudioPrompt);
        }

        Self {
            version: 1,
            delimiter: DEFAULT_DELIMITER.to_string(),
            fields,
        }
    }

    /// Schema for a sheet: the audio field is requested only when the sheet
    /// has somewhere to put it.
    pub fn for_columns(columns: &ColumnMap) -> Self {
        Self::v1(columns.contains(ContentField::AudioPrompt))
    }

    pub fn expected_fields(&self) -> usize {
        self.fields.len()
    }
}

/// Parsed fields, one per schema field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub fields: Vec<(ContentField, String)>,
    /// True when defaults were substituted for missing segments.
    pub degraded: bool,
    /// Delimiter-separated segments in the raw response, empty ones included.
    pub segments_found: usize,
}

impl ParsedContent {
    pub fn get(&self, field: ContentField) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Field values in schema order.
    pub fn values(&self) -> Vec<&str> {
        self.fields.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Assemble a package; fields absent from the schema are filled with the
    /// topic defaults, except the audio prompt which stays `None`.
    pub fn to_package(&self, topic: &str) -> ContentPackage {
        let value = |field: ContentField| {
            self.get(field)
                .map(str::to_string)
                .unwrap_or_else(|| ContentParser::default_for(field, topic))
        };

        ContentPackage {
            script: value(ContentField::Script),
            video_prompt: value(ContentField::VideoPrompt),
            caption: value(ContentField::Caption),
            audio_prompt: self.get(ContentField::AudioPrompt).map(str::to_string),
        }
    }
}

/// Splits model output according to a [`ContentSchema`].
#[derive(Debug, Clone)]
pub struct ContentParser {
    schema: ContentSchema,
}

impl ContentParser {
    pub fn new(schema: ContentSchema) -> Self {
        Self { schema }
    }

    /// Parse `raw` into exactly `expected_fields` values.
    ///
    /// Segments are positional: an empty section stays empty and later
    /// fields keep their place. Extra segments are ignored.
    pub fn parse(&self, raw: &str, topic: &str) -> ParsedContent {
        let expected = self.schema.expected_fields();
        let segments: Vec<&str> = raw
            .split(self.schema.delimiter.as_str())
            .map(str::trim)
            .collect();
        let segments_found = segments.len();

        if segments_found >= expected {
            let fields = self
                .schema
                .fields
                .iter()
                .zip(segments)
                .map(|(field, value)| (*field, value.to_string()))
                .collect();
            return ParsedContent {
                fields,
                degraded: false,
                segments_found,
            };
        }

        warn!(
            topic,
            segments_found,
            expected,
            schema_version = self.schema.version,
            "Response does not follow the delimiter format, filling defaults"
        );
        record_degraded_parse(self.schema.version);

        let script = segments
            .iter()
            .copied()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| raw.trim())
            .to_string();

        let fields = self
            .schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if i == 0 {
                    (*field, script.clone())
                } else {
                    (*field, Self::default_for(*field, topic))
                }
            })
            .collect();

        ParsedContent {
            fields,
            degraded: true,
            segments_found,
        }
    }

    /// Template value for a field the model did not supply. Never empty.
    pub fn default_for(field: ContentField, topic: &str) -> String {
        let topic = topic.trim();
        let subject = if topic.is_empty() { "the subject" } else { topic };

        match field {
            ContentField::Topic | ContentField::Script => subject.to_string(),
            ContentField::Status => WorkStatus::Unprocessed.as_str().to_string(),
            ContentField::VideoPrompt => format!(
                "Cinematic vertical video about {}, dramatic lighting, smooth camera movement, \
                 highly detailed, 9:16",
                subject
            ),
            ContentField::Caption => {
                let tag: String = topic.chars().filter(|c| !c.is_whitespace()).collect();
                if tag.is_empty() {
                    "#shorts #viral #trending".to_string()
                } else {
                    format!("#{} #shorts #viral #trending", tag)
                }
            }
            ContentField::AudioPrompt => format!(
                "Upbeat background music matching the mood of {}, no vocals",
                subject
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(with_audio: bool) -> ContentParser {
        ContentParser::new(ContentSchema::v1(with_audio))
    }

    #[test]
    fn test_parse_well_formed_response() {
        let raw = "猫が踊る\n###\nA cat dancing, cinematic\n###\n#猫 #バズる";
        let parsed = parser(false).parse(raw, "猫");

        assert!(!parsed.degraded);
        assert_eq!(
            parsed.values(),
            vec!["猫が踊る", "A cat dancing, cinematic", "#猫 #バズる"]
        );
    }

    #[test]
    fn test_parse_ignores_extra_segments() {
        let raw = "a ### b ### c ### d ### e";
        let parsed = parser(true).parse(raw, "t");
        assert_eq!(parsed.values(), vec!["a", "b", "c", "d"]);
        assert_eq!(parsed.segments_found, 5);
        assert_eq!(parsed.get(ContentField::AudioPrompt), Some("d"));
    }

    #[test]
    fn test_empty_section_keeps_field_positions() {
        let parsed = parser(false).parse("s ### ### c ### x", "t");
        assert!(!parsed.degraded);
        assert_eq!(parsed.values(), vec!["s", "", "c"]);
        assert_eq!(parsed.segments_found, 4);

        let parsed = parser(false).parse("script\n###\n\n###\ncaption", "t");
        assert!(!parsed.degraded);
        assert_eq!(parsed.get(ContentField::VideoPrompt), Some(""));
        assert_eq!(parsed.get(ContentField::Caption), Some("caption"));
    }

    #[test]
    fn test_degraded_script_skips_leading_empty_segment() {
        let parsed = parser(false).parse("###\nnarration only", "犬");
        assert!(parsed.degraded);
        assert_eq!(parsed.segments_found, 2);
        assert_eq!(parsed.get(ContentField::Script), Some("narration only"));
    }

    #[test]
    fn test_parse_without_delimiters_uses_defaults() {
        let raw = "  Just one block of narration.  ";
        let parsed = parser(false).parse(raw, "夜 の 猫");

        assert!(parsed.degraded);
        assert_eq!(parsed.get(ContentField::Script), Some("Just one block of narration."));
        assert!(parsed
            .get(ContentField::VideoPrompt)
            .unwrap()
            .contains("夜 の 猫"));
        assert_eq!(
            parsed.get(ContentField::Caption),
            Some("#夜の猫 #shorts #viral #trending")
        );
    }

    #[test]
    fn test_degraded_fields_never_empty() {
        for topic in ["", "  ", "猫"] {
            let parsed = parser(true).parse("only script", topic);
            assert_eq!(parsed.fields.len(), 4);
            for (field, value) in parsed.fields.iter().skip(1) {
                assert!(!value.is_empty(), "{} empty for topic {:?}", field, topic);
            }
        }
    }

    #[test]
    fn test_partial_response_is_degraded() {
        let parsed = parser(false).parse("script ### prompt", "犬");
        assert!(parsed.degraded);
        assert_eq!(parsed.get(ContentField::Script), Some("script"));
        assert_eq!(parsed.get(ContentField::Caption), Some("#犬 #shorts #viral #trending"));
    }

    #[test]
    fn test_schema_for_columns() {
        let columns = ColumnMap::from_header(&["Topic", "Status", "Script", "Prompt", "Caption"]);
        assert_eq!(ContentSchema::for_columns(&columns).expected_fields(), 3);

        let columns = ColumnMap::from_header(&["Topic", "Status", "Audio"]);
        let schema = ContentSchema::for_columns(&columns);
        assert_eq!(schema.expected_fields(), 4);
        assert_eq!(schema.fields.last(), Some(&ContentField::AudioPrompt));
    }

    #[test]
    fn test_to_package() {
        let parsed = parser(false).parse("s ### p ### c", "t");
        let package = parsed.to_package("t");
        assert_eq!(package.script, "s");
        assert_eq!(package.video_prompt, "p");
        assert_eq!(package.caption, "c");
        assert_eq!(package.audio_prompt, None);

        let parsed = parser(true).parse("s ### p ### c ### a", "t");
        assert_eq!(parsed.to_package("t").audio_prompt.as_deref(), Some("a"));
    }
}
