//! Writes generated content back to the row store.

use shortgen_models::{ColumnMap, ContentField, ContentPackage, WorkStatus};
use shortgen_sheets::RowStore;
use tracing::{debug, info, warn};

use crate::error::WorkerResult;

/// Writes a content package into one row, status last.
pub struct ResultWriter<'a> {
    store: &'a dyn RowStore,
    columns: &'a ColumnMap,
}

impl<'a> ResultWriter<'a> {
    pub fn new(store: &'a dyn RowStore, columns: &'a ColumnMap) -> Self {
        Self { store, columns }
    }

    /// Write every mapped content field, then mark the row `PROCESSED`.
    ///
    /// A failed content write returns before the status is touched, so the
    /// row stays selectable.
    pub async fn write(&self, row: u32, package: &ContentPackage) -> WorkerResult<usize> {
        let mut values = vec![
            (ContentField::Script, package.script.as_str()),
            (ContentField::VideoPrompt, package.video_prompt.as_str()),
            (ContentField::Caption, package.caption.as_str()),
        ];
        if let Some(audio) = &package.audio_prompt {
            values.push((ContentField::AudioPrompt, audio.as_str()));
        }

        let mut written = 0;
        for (field, value) in values {
            match self.columns.get(field) {
                Some(column) => {
                    self.store.write_cell(row, column, value).await?;
                    written += 1;
                }
                None => debug!(row, field = %field, "No column for field, skipping"),
            }
        }

        if let Some(column) = self.columns.get(ContentField::Status) {
            self.store
                .write_cell(row, column, WorkStatus::Processed.as_str())
                .await?;
        }

        info!(row, fields = written, "Row written");
        Ok(written)
    }

    /// Mark the row `ERROR`.
    pub async fn mark_error(&self, row: u32) -> WorkerResult<()> {
        match self.columns.get(ContentField::Status) {
            Some(column) => {
                self.store
                    .write_cell(row, column, WorkStatus::Error.as_str())
                    .await?;
                warn!(row, "Row marked as ERROR");
            }
            None => debug!(row, "No status column, cannot mark error"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_sheets::MemoryRowStore;

    fn package() -> ContentPackage {
        ContentPackage {
            script: "script".into(),
            video_prompt: "prompt".into(),
            caption: "#tag".into(),
            audio_prompt: Some("audio".into()),
        }
    }

    #[tokio::test]
    async fn test_write_fills_mapped_columns_and_status() {
        let header = ["Topic", "Status", "Script", "Prompt", "Caption"];
        let store = MemoryRowStore::with_header(&header);
        store.push_row(&["猫", "UNPROCESSED"]).await;
        let columns = ColumnMap::from_header(&header);

        let written = ResultWriter::new(&store, &columns)
            .write(2, &package())
            .await
            .unwrap();

        // No Audio column, so the audio prompt is dropped.
        assert_eq!(written, 3);
        assert_eq!(
            store.row(2).await.unwrap(),
            vec!["猫", "PROCESSED", "script", "prompt", "#tag"]
        );
    }

    #[tokio::test]
    async fn test_failed_content_write_leaves_status() {
        let header = ["Topic", "Status", "Script"];
        let store = MemoryRowStore::with_header(&header);
        store.push_row(&["猫", "UNPROCESSED"]).await;
        store.fail_next_writes(1).await;
        let columns = ColumnMap::from_header(&header);

        let result = ResultWriter::new(&store, &columns).write(2, &package()).await;

        assert!(result.is_err());
        assert_eq!(store.row(2).await.unwrap()[1], "UNPROCESSED");
    }

    #[tokio::test]
    async fn test_mark_error() {
        let header = ["Status", "Topic"];
        let store = MemoryRowStore::with_header(&header);
        store.push_row(&["UNPROCESSED", "猫"]).await;
        let columns = ColumnMap::from_header(&header);

        ResultWriter::new(&store, &columns).mark_error(2).await.unwrap();
        assert_eq!(store.row(2).await.unwrap()[0], "ERROR");
    }
}
