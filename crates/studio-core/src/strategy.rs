//! Mode-based strategy dispatch.
//!
//! Each [`GenerationStrategy`] shapes one provider call for one
//! [`OperationMode`].  The [`StrategyRegistry`] is an explicit table built at
//! startup; building fails if a mode is claimed twice or a dispatchable mode
//! has no strategy.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::context::GenerationContext;
use crate::descriptors::{OperationMode, StyleIntensity};
use crate::error::GenerationError;
use crate::provider::{AiCallRequest, ImageProvider, ImageSizing, ProviderError};

/// Default bound on a strategy's wait for the provider.
pub const DEFAULT_STRATEGY_WAIT: Duration = Duration::from_secs(30);

/// Modes that must have a strategy before the registry can be built.
/// `MULTI_IMAGE` is deliberately absent.
pub const DISPATCHABLE_MODES: [OperationMode; 3] = [
    OperationMode::TextToImage,
    OperationMode::EditExisting,
    OperationMode::StyleTransfer,
];

/// What a strategy hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image: Bytes,
    pub mime_type: String,
    /// Provider round-trip time.
    pub elapsed: Duration,
    /// Provider details, logged with the completed generation.
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait GenerationStrategy: Send + Sync + 'static {
    /// The mode this strategy executes.
    fn mode(&self) -> OperationMode;

    fn supports(&self, mode: OperationMode) -> bool {
        self.mode() == mode
    }

    async fn execute(&self, ctx: &GenerationContext) -> Result<GenerationResult, GenerationError>;
}

/// Invoke the provider with a hard deadline and map the result.
async fn call_with_deadline(
    provider: &dyn ImageProvider,
    request: AiCallRequest,
    wait: Duration,
) -> Result<GenerationResult, GenerationError> {
    let model = request.model.clone();
    let result = tokio::time::timeout(wait, provider.generate_image(request))
        .await
        .map_err(|_| ProviderError::Timeout { after: wait })??;

    let mut metadata = BTreeMap::new();
    metadata.insert("provider".to_owned(), provider.name().to_owned());
    metadata.insert("model".to_owned(), model);
    metadata.insert("bytes".to_owned(), result.image.len().to_string());

    Ok(GenerationResult {
        image: result.image,
        mime_type: result.mime_type,
        elapsed: result.elapsed,
        metadata,
    })
}

fn require_source(ctx: &GenerationContext) -> Result<Bytes, GenerationError> {
    ctx.source_image().cloned().ok_or_else(|| {
        GenerationError::invalid(
            "sourceImageBase64",
            format!("Source image is required for {}", ctx.settings().mode),
        )
    })
}

fn sized_request(ctx: &GenerationContext) -> AiCallRequest {
    let config = ctx.ai_config();
    AiCallRequest {
        thinking_level: Some(config.thinking_level),
        sizing: Some(ImageSizing {
            aspect_ratio: config.aspect_ratio.clone(),
            width: config.width,
            height: config.height,
        }),
        ..AiCallRequest::new(ctx.prompt(), config.model.clone())
    }
}

/// New image from the composed prompt with the full call configuration.
pub struct TextToImageStrategy {
    provider: Arc<dyn ImageProvider>,
    wait: Duration,
}

impl TextToImageStrategy {
    pub fn new(provider: Arc<dyn ImageProvider>, wait: Duration) -> Self {
        Self { provider, wait }
    }
}

#[async_trait]
impl GenerationStrategy for TextToImageStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::TextToImage
    }

    async fn execute(&self, ctx: &GenerationContext) -> Result<GenerationResult, GenerationError> {
        debug!(id = %ctx.id(), "text-to-image");
        call_with_deadline(self.provider.as_ref(), sized_request(ctx), self.wait).await
    }
}

/// Same as text-to-image plus the caller's source image.
pub struct EditImageStrategy {
    provider: Arc<dyn ImageProvider>,
    wait: Duration,
}

impl EditImageStrategy {
    pub fn new(provider: Arc<dyn ImageProvider>, wait: Duration) -> Self {
        Self { provider, wait }
    }
}

#[async_trait]
impl GenerationStrategy for EditImageStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::EditExisting
    }

    async fn execute(&self, ctx: &GenerationContext) -> Result<GenerationResult, GenerationError> {
        let source = require_source(ctx)?;
        debug!(id = %ctx.id(), source_bytes = source.len(), "edit");
        let request = AiCallRequest {
            source_image: Some(source),
            ..sized_request(ctx)
        };
        call_with_deadline(self.provider.as_ref(), request, self.wait).await
    }
}

/// Restyles the source image.  Sizing and thinking are left to the provider.
pub struct StyleTransferStrategy {
    provider: Arc<dyn ImageProvider>,
    wait: Duration,
}

impl StyleTransferStrategy {
    pub fn new(provider: Arc<dyn ImageProvider>, wait: Duration) -> Self {
        Self { provider, wait }
    }
}

#[async_trait]
impl GenerationStrategy for StyleTransferStrategy {
    fn mode(&self) -> OperationMode {
        OperationMode::StyleTransfer
    }

    async fn execute(&self, ctx: &GenerationContext) -> Result<GenerationResult, GenerationError> {
        let source = require_source(ctx)?;
        let intensity = ctx
            .request()
            .style_intensity
            .unwrap_or(StyleIntensity::Balanced);
        debug!(id = %ctx.id(), weight = intensity.weight(), "style transfer");

        let request = AiCallRequest {
            source_image: Some(source),
            intensity: Some(intensity),
            ..AiCallRequest::new(ctx.prompt(), ctx.ai_config().model.clone())
        };
        let mut result = call_with_deadline(self.provider.as_ref(), request, self.wait).await?;
        result
            .metadata
            .insert("intensity".to_owned(), intensity.weight().to_string());
        Ok(result)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("more than one strategy registered for mode {0}")]
    DuplicateMode(OperationMode),

    #[error("no strategy registered for mode {0}")]
    MissingMode(OperationMode),
}

/// Mode → strategy table.
pub struct StrategyRegistry {
    strategies: HashMap<OperationMode, Arc<dyn GenerationStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut modes: Vec<&str> = self.strategies.keys().map(|m| m.key()).collect();
        modes.sort_unstable();
        f.debug_struct("StrategyRegistry").field("modes", &modes).finish()
    }
}

impl StrategyRegistry {
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// The three built-in strategies sharing one provider.
    pub fn standard(provider: Arc<dyn ImageProvider>, wait: Duration) -> Result<Self, RegistryError> {
        Self::builder()
            .register(TextToImageStrategy::new(provider.clone(), wait))?
            .register(EditImageStrategy::new(provider.clone(), wait))?
            .register(StyleTransferStrategy::new(provider, wait))?
            .build()
    }

    /// The strategy for `mode`, or `UnsupportedMode`.
    pub fn resolve(&self, mode: OperationMode) -> Result<Arc<dyn GenerationStrategy>, GenerationError> {
        self.strategies
            .get(&mode)
            .filter(|s| s.supports(mode))
            .cloned()
            .ok_or(GenerationError::UnsupportedMode(mode))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[derive(Default)]
pub struct StrategyRegistryBuilder {
    strategies: HashMap<OperationMode, Arc<dyn GenerationStrategy>>,
}

impl StrategyRegistryBuilder {
    pub fn register<S: GenerationStrategy>(mut self, strategy: S) -> Result<Self, RegistryError> {
        let mode = strategy.mode();
        if self.strategies.contains_key(&mode) {
            return Err(RegistryError::DuplicateMode(mode));
        }
        self.strategies.insert(mode, Arc::new(strategy));
        Ok(self)
    }

    /// Fails if any dispatchable mode is left without a strategy.
    pub fn build(self) -> Result<StrategyRegistry, RegistryError> {
        if let Some(missing) = DISPATCHABLE_MODES
            .iter()
            .find(|m| !self.strategies.contains_key(m))
        {
            return Err(RegistryError::MissingMode(*missing));
        }
        info!(strategies = self.strategies.len(), "strategy registry ready");
        Ok(StrategyRegistry {
            strategies: self.strategies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{AspectRatio, ResolutionQuality, ThinkingLevel};
    use crate::request::{GenerateImageRequest, GenerationSettings};
    use crate::tests::{Reply, ScriptedProvider};

    fn context(mode: OperationMode, source: Option<&'static [u8]>) -> GenerationContext {
        let request = GenerateImageRequest {
            style_intensity: Some(StyleIntensity::Aggressive),
            ..GenerateImageRequest::new("a cat", mode)
        };
        let settings = GenerationSettings {
            mode,
            aspect_ratio: AspectRatio::Ratio16x9,
            resolution: ResolutionQuality::Standard,
            thinking_level: ThinkingLevel::Fast,
        };
        GenerationContext::new(
            "img_test".into(),
            "a cat".into(),
            request,
            settings,
            "test-model",
            source.map(Bytes::from_static),
        )
    }

    #[test]
    fn every_dispatchable_mode_resolves_to_exactly_its_strategy() {
        let registry =
            StrategyRegistry::standard(ScriptedProvider::image(b"x"), DEFAULT_STRATEGY_WAIT).unwrap();
        assert_eq!(registry.len(), DISPATCHABLE_MODES.len());
        for mode in DISPATCHABLE_MODES {
            assert_eq!(registry.resolve(mode).unwrap().mode(), mode);
        }
    }

    #[test]
    fn unwired_mode_is_unsupported() {
        let registry =
            StrategyRegistry::standard(ScriptedProvider::image(b"x"), DEFAULT_STRATEGY_WAIT).unwrap();
        let Err(err) = registry.resolve(OperationMode::MultiImage) else {
            panic!("MULTI_IMAGE must not resolve");
        };
        assert!(matches!(err, GenerationError::UnsupportedMode(OperationMode::MultiImage)));
    }

    #[test]
    fn duplicate_and_missing_registrations_fail() {
        let provider = ScriptedProvider::image(b"x");
        let err = StrategyRegistry::builder()
            .register(TextToImageStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT))
            .unwrap()
            .register(TextToImageStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT))
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateMode(OperationMode::TextToImage)));

        let err = StrategyRegistry::builder()
            .register(TextToImageStrategy::new(provider, DEFAULT_STRATEGY_WAIT))
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::MissingMode(OperationMode::EditExisting));
    }

    #[tokio::test]
    async fn text_to_image_sends_sizing_without_source() {
        let provider = ScriptedProvider::image(b"png");
        let strategy = TextToImageStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT);
        let result = strategy
            .execute(&context(OperationMode::TextToImage, Some(b"ignored")))
            .await
            .unwrap();
        assert_eq!(result.image.as_ref(), b"png");

        let call = provider.last_call().unwrap();
        assert_eq!(call.model, "test-model");
        assert_eq!(call.thinking_level, Some(ThinkingLevel::Fast));
        assert_eq!(call.sizing.unwrap().aspect_ratio, "16:9");
        assert!(call.source_image.is_none());
        assert!(call.intensity.is_none());
    }

    #[tokio::test]
    async fn edit_attaches_source_image() {
        let provider = ScriptedProvider::image(b"png");
        let strategy = EditImageStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT);
        strategy
            .execute(&context(OperationMode::EditExisting, Some(b"source")))
            .await
            .unwrap();
        let call = provider.last_call().unwrap();
        assert_eq!(call.source_image.as_deref(), Some(&b"source"[..]));
        assert!(call.sizing.is_some());
    }

    #[tokio::test]
    async fn edit_without_source_never_calls_provider() {
        let provider = ScriptedProvider::image(b"png");
        let strategy = EditImageStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT);
        let err = strategy
            .execute(&context(OperationMode::EditExisting, None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn style_transfer_sends_intensity_only() {
        let provider = ScriptedProvider::image(b"png");
        let strategy = StyleTransferStrategy::new(provider.clone(), DEFAULT_STRATEGY_WAIT);
        let result = strategy
            .execute(&context(OperationMode::StyleTransfer, Some(b"source")))
            .await
            .unwrap();
        assert_eq!(result.metadata.get("intensity").map(String::as_str), Some("0.9"));

        let call = provider.last_call().unwrap();
        assert_eq!(call.intensity, Some(StyleIntensity::Aggressive));
        assert!(call.sizing.is_none());
        assert!(call.thinking_level.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_provider_fails_after_the_bound() {
        let provider = ScriptedProvider::new(Reply::Hang);
        let strategy = TextToImageStrategy::new(provider, Duration::from_secs(30));
        let err = strategy
            .execute(&context(OperationMode::TextToImage, None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
        assert!(err.to_string().contains("timed out"));
    }
}
