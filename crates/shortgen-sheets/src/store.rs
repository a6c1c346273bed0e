//! Row store abstraction.

use async_trait::async_trait;

use crate::error::SheetsResult;

/// Tabular store holding one work item per row.
///
/// Rows and columns are 1-based; row 1 is the header. Implementations assume
/// a single writer: `append_row` reports the index it wrote to, but a second
/// concurrent writer may still race on row selection.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Ordered header names (row 1).
    async fn header(&self) -> SheetsResult<Vec<String>>;

    /// First data row (row > 1) whose cell in `column` equals `value`.
    async fn find_row(&self, column: u32, value: &str) -> SheetsResult<Option<u32>>;

    /// Value at (row, column); `None` when the cell is empty or out of range.
    async fn read_cell(&self, row: u32, column: u32) -> SheetsResult<Option<String>>;

    /// All values of a column, starting at row 1 (header included).
    async fn column_values(&self, column: u32) -> SheetsResult<Vec<String>>;

    /// Append a row after the last one and return its index.
    async fn append_row(&self, values: Vec<String>) -> SheetsResult<u32>;

    /// Overwrite a single cell.
    async fn write_cell(&self, row: u32, column: u32, value: &str) -> SheetsResult<()>;
}
