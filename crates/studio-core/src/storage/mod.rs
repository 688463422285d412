//! Persistence collaborators: image bytes and generation records.

mod local;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::descriptors::OperationMode;

pub use local::LocalImageStore;
pub use memory::InMemoryRecordStore;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No stored artifact for this id.
    #[error("{0}")]
    NotFound(String),

    /// The id cannot be mapped to a storage key.
    #[error("invalid image id: {0:?}")]
    InvalidId(String),
}

/// One persisted generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub file_path: String,
    pub prompt: String,
    pub mode: OperationMode,
    pub generation_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// One page of a newest-first listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: usize, size: usize, total_elements: usize) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

/// Binary image storage keyed by image id.
#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    /// Persist `bytes` and return the storage path.
    async fn save(&self, id: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn load(&self, id: &str) -> Result<Bytes, StorageError>;

    /// `Ok(false)` when nothing was stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    async fn exists(&self, id: &str) -> bool;
}

/// Generation record storage.  Safe for concurrent writers with distinct ids.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn save(&self, record: ImageRecord) -> Result<(), StorageError>;

    async fn find(&self, id: &str) -> Option<ImageRecord>;

    /// Newest first; `page` is zero-based.
    async fn list(&self, page: usize, size: usize) -> Page<ImageRecord>;

    async fn delete(&self, id: &str) -> bool;
}
