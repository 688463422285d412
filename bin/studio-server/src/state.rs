//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use studio_core::events::DEFAULT_EVENT_CAPACITY;
use studio_core::{
    EventPublisher, Gallery, GenerationOrchestrator, ImageProvider, ImageStore,
    InMemoryRecordStore, LocalImageStore, RecordStore, StrategyRegistry, WorkerPool,
};
use tracing::info;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Generation pipeline.
    pub orchestrator: GenerationOrchestrator,
    /// History listing and deletion.
    pub gallery: Gallery,
}

impl AppState {
    /// Wire the pipeline around `provider`.  Fails if the strategy table is
    /// incomplete or the storage directory cannot be created.
    pub async fn new(config: Config, provider: Arc<dyn ImageProvider>) -> anyhow::Result<Self> {
        let registry = StrategyRegistry::standard(provider, config.strategy_wait())?;

        let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::open(&config.storage_path).await?);
        let records: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());

        let orchestrator = GenerationOrchestrator::new(
            Arc::new(registry),
            Arc::clone(&images),
            Arc::clone(&records),
            EventPublisher::spawn(DEFAULT_EVENT_CAPACITY),
            WorkerPool::new(config.pool_config()),
            config.gemini_model.clone(),
        );
        info!(storage = %config.storage_path, "generation pipeline ready");

        Ok(Self {
            config: Arc::new(config),
            orchestrator,
            gallery: Gallery::new(records, images),
        })
    }
}
