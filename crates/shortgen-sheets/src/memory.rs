//! In-memory row store.
//!
//! Backs tests and local dry runs. Failure injection lets callers exercise
//! the store-unavailable paths without a network.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{SheetsError, SheetsResult};
use crate::store::RowStore;

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<Vec<String>>,
    failing_writes: u32,
    appended: u32,
}

/// Row store held in memory. Row 1 is the header.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    inner: Mutex<Inner>,
}

impl MemoryRowStore {
    /// Create a store with the given header row and no data.
    pub fn with_header<S: AsRef<str>>(header: &[S]) -> Self {
        let header = header.iter().map(|s| s.as_ref().to_string()).collect();
        Self {
            inner: Mutex::new(Inner {
                rows: vec![header],
                ..Default::default()
            }),
        }
    }

    /// Add a data row directly (no append bookkeeping).
    pub async fn push_row<S: AsRef<str>>(&self, values: &[S]) {
        let mut inner = self.inner.lock().await;
        inner
            .rows
            .push(values.iter().map(|s| s.as_ref().to_string()).collect());
    }

    /// Make the next `count` write/append calls fail with a 503.
    pub async fn fail_next_writes(&self, count: u32) {
        self.inner.lock().await.failing_writes = count;
    }

    /// Snapshot of a row (1-based).
    pub async fn row(&self, row: u32) -> Option<Vec<String>> {
        let inner = self.inner.lock().await;
        inner.rows.get(row.checked_sub(1)? as usize).cloned()
    }

    /// Total number of rows including the header.
    pub async fn row_count(&self) -> u32 {
        self.inner.lock().await.rows.len() as u32
    }

    /// Number of rows added through `append_row`.
    pub async fn appended_rows(&self) -> u32 {
        self.inner.lock().await.appended
    }

    fn check_write(inner: &mut Inner) -> SheetsResult<()> {
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(SheetsError::ServerError(503, "injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn header(&self) -> SheetsResult<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.rows.first().cloned().unwrap_or_default())
    }

    async fn find_row(&self, column: u32, value: &str) -> SheetsResult<Option<u32>> {
        let inner = self.inner.lock().await;
        let index = column.saturating_sub(1) as usize;

        Ok(inner
            .rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.get(index).map(String::as_str) == Some(value))
            .map(|(i, _)| i as u32 + 1))
    }

    async fn read_cell(&self, row: u32, column: u32) -> SheetsResult<Option<String>> {
        let inner = self.inner.lock().await;
        let value = row
            .checked_sub(1)
            .zip(column.checked_sub(1))
            .and_then(|(r, c)| inner.rows.get(r as usize)?.get(c as usize))
            .filter(|v| !v.is_empty())
            .cloned();
        Ok(value)
    }

    async fn column_values(&self, column: u32) -> SheetsResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let index = column.saturating_sub(1) as usize;
        let mut values: Vec<String> = inner
            .rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect();

        // Match the Sheets API, which drops trailing empty cells.
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn append_row(&self, values: Vec<String>) -> SheetsResult<u32> {
        let mut inner = self.inner.lock().await;
        Self::check_write(&mut inner)?;
        inner.rows.push(values);
        inner.appended += 1;
        Ok(inner.rows.len() as u32)
    }

    async fn write_cell(&self, row: u32, column: u32, value: &str) -> SheetsResult<()> {
        if row == 0 || column == 0 {
            return Err(SheetsError::request_failed(format!(
                "invalid cell ({}, {})",
                row, column
            )));
        }

        let mut inner = self.inner.lock().await;
        Self::check_write(&mut inner)?;

        let (r, c) = (row as usize - 1, column as usize - 1);
        if inner.rows.len() <= r {
            inner.rows.resize(r + 1, Vec::new());
        }
        let cells = &mut inner.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, String::new());
        }
        cells[c] = value.to_string();
        Ok(())
    }
}
