//! The immutable per-request bundle handed from composition to strategies.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use uuid::Uuid;

use crate::descriptors::{AspectRatio, ResolutionQuality, ThinkingLevel};
use crate::error::GenerationError;
use crate::request::{GenerateImageRequest, GenerationSettings};

/// Prefix of every generated image id.
pub const IMAGE_ID_PREFIX: &str = "img_";

/// A fresh image identifier: `img_` followed by the 32 hex digits of a v4
/// UUID (122 random bits).
pub fn new_image_id() -> String {
    format!("{IMAGE_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Decode a caller-supplied base64 image, tolerating a `data:*;base64,`
/// prefix and surrounding whitespace.
pub fn decode_source_image(encoded: &str) -> Result<Bytes, GenerationError> {
    let trimmed = encoded.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| GenerationError::invalid("sourceImageBase64", "Source image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(GenerationError::invalid("sourceImageBase64", "Source image is empty"));
    }
    Ok(Bytes::from(bytes))
}

/// Resolved provider call settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCallConfig {
    pub model: String,
    pub thinking_level: ThinkingLevel,
    /// Provider-facing aspect ratio, e.g. `"1:1"`.
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
}

impl AiCallConfig {
    pub fn resolve(
        model: impl Into<String>,
        thinking_level: ThinkingLevel,
        aspect_ratio: AspectRatio,
        resolution: ResolutionQuality,
    ) -> Self {
        let (width, height) = resolution.dimensions();
        Self {
            model: model.into(),
            thinking_level,
            aspect_ratio: aspect_ratio.api_value().to_owned(),
            width,
            height,
        }
    }
}

/// Snapshot of one request's execution state.  Built once by the
/// orchestrator and only ever read afterwards.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    id: String,
    prompt: String,
    request: GenerateImageRequest,
    settings: GenerationSettings,
    ai_config: AiCallConfig,
    source_image: Option<Bytes>,
}

impl GenerationContext {
    pub fn new(
        id: String,
        prompt: String,
        request: GenerateImageRequest,
        settings: GenerationSettings,
        model: &str,
        source_image: Option<Bytes>,
    ) -> Self {
        let ai_config = AiCallConfig::resolve(
            model,
            settings.thinking_level,
            settings.aspect_ratio,
            settings.resolution,
        );
        Self {
            id,
            prompt,
            request,
            settings,
            ai_config,
            source_image,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn request(&self) -> &GenerateImageRequest {
        &self.request
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn ai_config(&self) -> &AiCallConfig {
        &self.ai_config
    }

    pub fn source_image(&self) -> Option<&Bytes> {
        self.source_image.as_ref()
    }
}
