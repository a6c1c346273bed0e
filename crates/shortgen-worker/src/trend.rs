//! Trend cell interpretation.

use shortgen_models::TrendDirective;

/// Cell values that switch trend steering off (compared case-insensitively).
pub const DISABLE_SENTINELS: &[&str] = &[
    "off", "none", "no", "false", "オフ", "なし", "無し", "ナシ", "不要",
];

/// Map a raw trend cell value to a directive.
pub fn resolve(raw: Option<&str>) -> TrendDirective {
    let value = match raw.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return TrendDirective::AutoSearch,
    };

    let lowered = value.to_lowercase();
    if DISABLE_SENTINELS.iter().any(|s| *s == lowered) {
        TrendDirective::Disabled
    } else {
        TrendDirective::Keyword(value.to_string())
    }
}

/// Prompt sentence for a directive. Embedded verbatim in both the topic and
/// the content prompts.
pub fn instruction(directive: &TrendDirective) -> String {
    match directive {
        TrendDirective::AutoSearch => {
            "Search for the latest viral trends in this genre and incorporate them.".to_string()
        }
        TrendDirective::Disabled => {
            "Focus strictly on the given topic. Do not bring in outside trends or current events."
                .to_string()
        }
        TrendDirective::Keyword(keyword) => {
            format!("Treat \"{}\" as the priority trend and incorporate it.", keyword)
        }
    }
}
