//! Header-derived column mapping.

use std::collections::HashMap;

use crate::work_item::ContentField;

/// Mapping from semantic field to 1-based column index.
///
/// Resolved once per run from the header row. A field whose header is absent
/// has no mapping; reads and writes tied to it are skipped by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<ContentField, u32>,
    width: u32,
}

impl ColumnMap {
    /// Resolve from an ordered header row. Duplicate names map to the first
    /// occurrence; matching is exact.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Self {
        let mut columns = HashMap::new();

        for field in ContentField::ALL {
            if let Some(index) = header
                .iter()
                .position(|name| name.as_ref() == field.header_name())
            {
                columns.insert(field, index as u32 + 1);
            }
        }

        Self {
            columns,
            width: header.len() as u32,
        }
    }

    /// Column index for a field, if its header exists.
    pub fn get(&self, field: ContentField) -> Option<u32> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: ContentField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Number of header cells (the width of a full row).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Build a full-width row with the given field values placed in their
    /// columns. Unmapped fields are dropped.
    pub fn build_row(&self, values: &[(ContentField, &str)]) -> Vec<String> {
        let mut width = self.width as usize;
        for (field, _) in values {
            if let Some(col) = self.get(*field) {
                width = width.max(col as usize);
            }
        }

        let mut row = vec![String::new(); width];
        for (field, value) in values {
            if let Some(col) = self.get(*field) {
                row[col as usize - 1] = (*value).to_string();
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_maps_known_fields() {
        let map = ColumnMap::from_header(&["Topic", "Status", "Script", "Prompt", "Caption"]);
        assert_eq!(map.get(ContentField::Topic), Some(1));
        assert_eq!(map.get(ContentField::Status), Some(2));
        assert_eq!(map.get(ContentField::Caption), Some(5));
        assert_eq!(map.get(ContentField::AudioPrompt), None);
        assert_eq!(map.width(), 5);
    }

    #[test]
    fn test_from_header_is_exact_match() {
        let map = ColumnMap::from_header(&["topic", "Status "]);
        assert!(!map.contains(ContentField::Topic));
        assert!(!map.contains(ContentField::Status));
    }

    #[test]
    fn test_duplicate_header_uses_first() {
        let map = ColumnMap::from_header(&["Topic", "Topic", "Status"]);
        assert_eq!(map.get(ContentField::Topic), Some(1));
    }

    #[test]
    fn test_build_row_places_values() {
        let map = ColumnMap::from_header(&["Script", "Topic", "Status"]);
        let row = map.build_row(&[
            (ContentField::Topic, "猫"),
            (ContentField::Status, "UNPROCESSED"),
            (ContentField::AudioPrompt, "ignored"),
        ]);
        assert_eq!(row, vec!["", "猫", "UNPROCESSED"]);
    }
}
