//! Paginated history and deletion.

use std::sync::Arc;

use tracing::info;

use crate::error::GenerationError;
use crate::storage::{ImageRecord, ImageStore, Page, RecordStore};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct Gallery {
    records: Arc<dyn RecordStore>,
    images: Arc<dyn ImageStore>,
}

impl Gallery {
    pub fn new(records: Arc<dyn RecordStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { records, images }
    }

    /// Newest first.  `size` defaults to 20 and is clamped to `1..=100`.
    pub async fn list(&self, page: Option<usize>, size: Option<usize>) -> Page<ImageRecord> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.records.list(page.unwrap_or(0), size).await
    }

    /// Remove the record and its file.  `NotFound` only when neither existed.
    pub async fn delete(&self, id: &str) -> Result<(), GenerationError> {
        let had_record = self.records.delete(id).await;
        let had_file = match self.images.delete(id).await {
            Ok(deleted) => deleted,
            Err(crate::storage::StorageError::InvalidId(_)) => false,
            Err(e) => return Err(e.into()),
        };
        if !had_record && !had_file {
            return Err(GenerationError::NotFound(id.to_owned()));
        }
        info!(id, had_record, had_file, "image deleted");
        Ok(())
    }
}
