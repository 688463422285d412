use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ImageRecord, Page, RecordStore, StorageError};

/// Process-local record store.
///
/// A `tokio::sync::RwLock<HashMap>` lets listings proceed concurrently while
/// writers insert under their own unique ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<HashMap<String, ImageRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, record: ImageRecord) -> Result<(), StorageError> {
        self.inner.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn find(&self, id: &str) -> Option<ImageRecord> {
        self.inner.read().await.get(id).cloned()
    }

    async fn list(&self, page: usize, size: usize) -> Page<ImageRecord> {
        let mut all: Vec<ImageRecord> = self.inner.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let total = all.len();
        let content = all
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();
        Page::new(content, page, size, total)
    }

    async fn delete(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }
}
