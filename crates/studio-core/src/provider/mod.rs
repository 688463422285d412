//! Provider-agnostic call shapes and the single-call provider interface.
//!
//! Only the adapter in [`gemini`] knows the vendor wire format; strategies
//! build an [`AiCallRequest`] and receive an [`AiCallResult`].

pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::descriptors::{StyleIntensity, ThinkingLevel};

pub use gemini::{GeminiClient, GeminiConfig};

/// Output sizing forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSizing {
    /// Provider-facing aspect ratio, e.g. `"16:9"`.
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
}

/// One provider call.
#[derive(Debug, Clone)]
pub struct AiCallRequest {
    pub prompt: String,
    pub model: String,
    pub thinking_level: Option<ThinkingLevel>,
    pub sizing: Option<ImageSizing>,
    pub source_image: Option<Bytes>,
    pub intensity: Option<StyleIntensity>,
}

impl AiCallRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            thinking_level: None,
            sizing: None,
            source_image: None,
            intensity: None,
        }
    }
}

/// What a provider returns for a successful call.
#[derive(Debug, Clone)]
pub struct AiCallResult {
    pub image: Bytes,
    pub mime_type: String,
    pub elapsed: Duration,
}

/// Provider failures, classified by transport status first.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// HTTP 429.
    #[error("provider quota exceeded; retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    /// Any other 4xx; not retryable.
    #[error("provider rejected the request ({status}): {message}")]
    ClientError {
        status: u16,
        message: String,
        /// Raw provider error body.
        body: String,
    },

    /// 5xx or a transport failure before any status was received.
    #[error("provider unavailable{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    UpstreamUnavailable { status: Option<u16>, message: String },

    /// The wall-clock bound on the call expired.
    #[error("provider call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// A 2xx response without a usable image.
    #[error("invalid provider response: {0}")]
    InvalidProviderResponse(String),

    /// The adapter could not be constructed or addressed.
    #[error("provider misconfigured: {0}")]
    Config(String),
}

/// A generative-AI provider that turns one request into one image.
#[async_trait]
pub trait ImageProvider: Send + Sync + 'static {
    /// Short provider name used in logs and metadata.
    fn name(&self) -> &str;

    async fn generate_image(&self, request: AiCallRequest) -> Result<AiCallResult, ProviderError>;
}
