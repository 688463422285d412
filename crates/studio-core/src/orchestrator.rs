//! The generation pipeline.
//!
//! Per request: id → prompt → decode source → context → strategy → persist →
//! publish → response.  A failure before persistence leaves nothing behind;
//! a persistence failure is fatal and never yields a record without a file.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, warn};
use utoipa::ToSchema;

use crate::context::{GenerationContext, decode_source_image, new_image_id};
use crate::error::GenerationError;
use crate::events::{EventPublisher, StudioEvent};
use crate::pool::WorkerPool;
use crate::prompt::PromptComposer;
use crate::request::{EditImageRequest, GenerateImageRequest, GenerationSettings};
use crate::storage::{ImageRecord, ImageStore, RecordStore};
use crate::strategy::StrategyRegistry;

/// Public URL of a stored image.
pub fn image_url(id: &str) -> String {
    format!("/api/v1/images/{id}/file")
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub model: String,
    /// Thinking level key, e.g. `"FAST"`.
    pub thinking_level: String,
    /// Provider-facing aspect ratio, e.g. `"1:1"`.
    pub aspect_ratio: String,
    /// Resolution key, e.g. `"STANDARD"`.
    pub resolution: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImageResponse {
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub generation_time_ms: u64,
    pub metadata: ImageMetadata,
}

/// Sequences composition, dispatch and persistence.  Cheap to clone.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    composer: PromptComposer,
    registry: Arc<StrategyRegistry>,
    images: Arc<dyn ImageStore>,
    records: Arc<dyn RecordStore>,
    events: EventPublisher,
    pool: WorkerPool,
    model: String,
}

impl GenerationOrchestrator {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        images: Arc<dyn ImageStore>,
        records: Arc<dyn RecordStore>,
        events: EventPublisher,
        pool: WorkerPool,
        model: impl Into<String>,
    ) -> Self {
        Self {
            composer: PromptComposer::default(),
            registry,
            images,
            records,
            events,
            pool,
            model: model.into(),
        }
    }

    /// Validate, then run the pipeline on the worker pool inside the
    /// caller's span.
    pub async fn generate(
        &self,
        request: GenerateImageRequest,
    ) -> Result<GeneratedImageResponse, GenerationError> {
        let settings = request.validated()?;
        let this = self.clone();
        self.pool
            .run(async move { this.execute(request, settings).await }.in_current_span())
            .await?
    }

    /// Normalise an edit request and generate from it.
    pub async fn edit(
        &self,
        request: EditImageRequest,
    ) -> Result<GeneratedImageResponse, GenerationError> {
        request.check()?;
        self.generate(request.into_generate_request()).await
    }

    /// Stored bytes of a previously generated image.
    pub async fn image_file(&self, id: &str) -> Result<Bytes, GenerationError> {
        if self.records.find(id).await.is_none() {
            return Err(GenerationError::NotFound(id.to_owned()));
        }
        Ok(self.images.load(id).await?)
    }

    async fn execute(
        &self,
        request: GenerateImageRequest,
        settings: GenerationSettings,
    ) -> Result<GeneratedImageResponse, GenerationError> {
        let started = Instant::now();

        let id = new_image_id();
        let prompt = self.composer.compose(&request);
        let source = request
            .source_image_base64
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(decode_source_image)
            .transpose()?;
        let ctx = GenerationContext::new(id, prompt, request, settings, &self.model, source);

        info!(id = %ctx.id(), mode = %settings.mode, "generation started");
        let strategy = self.registry.resolve(settings.mode)?;
        let result = strategy.execute(&ctx).await.inspect_err(|e| {
            warn!(id = %ctx.id(), error = %e, "generation failed");
        })?;

        let generation_time_ms = started.elapsed().as_millis() as u64;
        let record = self.persist(&ctx, &result.image, generation_time_ms).await?;
        self.events.publish(StudioEvent::ImageGenerated {
            record: record.clone(),
        });

        info!(
            id = %record.id,
            generation_time_ms,
            provider_ms = result.elapsed.as_millis() as u64,
            mime_type = %result.mime_type,
            provider = ?result.metadata,
            "generation completed"
        );

        Ok(GeneratedImageResponse {
            image_url: image_url(&record.id),
            id: record.id,
            prompt: record.prompt,
            generation_time_ms,
            metadata: ImageMetadata {
                model: ctx.ai_config().model.clone(),
                thinking_level: settings.thinking_level.key().to_owned(),
                aspect_ratio: ctx.ai_config().aspect_ratio.clone(),
                resolution: settings.resolution.key().to_owned(),
                created_at: record.created_at,
            },
        })
    }

    /// File first, then record.  A record failure removes the file again.
    async fn persist(
        &self,
        ctx: &GenerationContext,
        image: &[u8],
        generation_time_ms: u64,
    ) -> Result<ImageRecord, GenerationError> {
        let file_path = self.images.save(ctx.id(), image).await.map_err(|e| {
            error!(id = %ctx.id(), error = %e, "failed to store image");
            GenerationError::Internal(format!("failed to store image: {e}"))
        })?;

        let record = ImageRecord {
            id: ctx.id().to_owned(),
            file_path,
            prompt: ctx.prompt().to_owned(),
            mode: ctx.settings().mode,
            generation_time_ms,
            created_at: Utc::now(),
        };

        if let Err(e) = self.records.save(record.clone()).await {
            error!(id = %ctx.id(), error = %e, "failed to store record");
            if let Err(cleanup) = self.images.delete(ctx.id()).await {
                warn!(id = %ctx.id(), error = %cleanup, "failed to remove orphaned image");
            }
            return Err(GenerationError::Internal(format!("failed to store record: {e}")));
        }
        Ok(record)
    }
}
