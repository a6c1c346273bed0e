//! Sheets REST API types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A block of cell values (`spreadsheets.values` resource).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Single-row payload for writes and appends.
    pub fn single_row(range: impl Into<String>, row: Vec<String>) -> Self {
        Self {
            range: Some(range.into()),
            major_dimension: Some("ROWS".to_string()),
            values: vec![row.into_iter().map(Value::String).collect()],
        }
    }

    /// First row (or column, for COLUMNS-major reads) as text.
    pub fn first_line(&self) -> Vec<String> {
        self.values
            .first()
            .map(|line| line.iter().map(cell_text).collect())
            .unwrap_or_default()
    }

    /// Top-left cell as text, `None` when empty.
    pub fn first_cell(&self) -> Option<String> {
        self.values
            .first()
            .and_then(|line| line.first())
            .map(cell_text)
            .filter(|v| !v.is_empty())
    }
}

/// Response of `values:append`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
}

/// Render a cell value as text (formatted values come back as strings).
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extract the first row number from an A1 range such as `'Sheet 1'!A12:E12`.
pub fn first_row_of_range(range: &str) -> Option<u32> {
    let cells = range.rsplit('!').next()?;
    let start = cells.split(':').next()?;
    let digits: String = start.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}
