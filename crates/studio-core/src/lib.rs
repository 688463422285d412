//! Image generation pipeline: descriptor tables, prompt composition,
//! mode-based strategy dispatch and the provider adapter, plus the storage,
//! event and worker-pool collaborators the orchestrator sequences.

pub mod context;
pub mod descriptors;
pub mod error;
pub mod events;
pub mod gallery;
pub mod options;
pub mod orchestrator;
pub mod pool;
pub mod prompt;
pub mod provider;
pub mod request;
pub mod storage;
pub mod strategy;


pub use error::{ErrorKind, FieldError, GenerationError};
pub use events::{EventPublisher, StudioEvent};
pub use gallery::Gallery;
pub use options::StudioOptions;
pub use orchestrator::{GeneratedImageResponse, GenerationOrchestrator, ImageMetadata};
pub use pool::{PoolConfig, WorkerPool};
pub use provider::{GeminiClient, GeminiConfig, ImageProvider, ProviderError};
pub use request::{EditImageRequest, GenerateImageRequest};
pub use storage::{
    ImageRecord, ImageStore, InMemoryRecordStore, LocalImageStore, Page, RecordStore, StorageError,
};
pub use strategy::{RegistryError, StrategyRegistry};
