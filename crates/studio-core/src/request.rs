//! Inbound request shapes and their validation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::descriptors::{
    AestheticStyle, AspectRatio, CameraComposition, ColorPalette, LensEffect, LightingSetup,
    OperationMode, ResolutionQuality, StyleIntensity, ThinkingLevel,
};
use crate::error::{FieldError, GenerationError};

/// Maximum accepted subject length, in characters.
pub const MAX_SUBJECT_CHARS: u64 = 500;

/// Request body for `POST /api/v1/images/generate`.
///
/// Optional selectors that are absent contribute nothing to the prompt.
/// Required fields are `Option`s so that a missing value is reported as a
/// per-field validation message rather than a deserialisation failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    /// What the image should depict.
    #[validate(
        custom(function = "not_blank", message = "Subject is required"),
        length(max = 500, message = "Subject must be under 500 characters")
    )]
    #[serde(default)]
    pub subject: String,

    #[validate(required(message = "Operation mode is required"))]
    pub operation_mode: Option<OperationMode>,

    pub aesthetic_style: Option<AestheticStyle>,
    pub lighting: Option<LightingSetup>,
    pub camera_composition: Option<CameraComposition>,
    pub color_palette: Option<ColorPalette>,
    pub lens_effect: Option<LensEffect>,

    #[validate(required(message = "Aspect ratio is required"))]
    pub aspect_ratio: Option<AspectRatio>,

    #[validate(required(message = "Resolution is required"))]
    pub resolution: Option<ResolutionQuality>,

    #[validate(required(message = "Thinking level is required"))]
    pub thinking_level: Option<ThinkingLevel>,

    pub style_intensity: Option<StyleIntensity>,

    /// Base64-encoded source image (a `data:` URL prefix is tolerated).
    pub source_image_base64: Option<String>,
}

/// Request body for `POST /api/v1/images/edit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditImageRequest {
    #[validate(
        custom(function = "not_blank", message = "Subject is required"),
        length(max = 500, message = "Subject must be under 500 characters")
    )]
    #[serde(default)]
    pub subject: String,

    #[validate(custom(function = "not_blank", message = "Source image is required"))]
    #[serde(default)]
    pub source_image_base64: String,

    #[validate(required(message = "Operation mode is required"))]
    pub operation_mode: Option<OperationMode>,

    pub aesthetic_style: Option<AestheticStyle>,
    pub lighting: Option<LightingSetup>,
    pub style_intensity: Option<StyleIntensity>,

    pub aspect_ratio: Option<AspectRatio>,
    pub resolution: Option<ResolutionQuality>,
    pub thinking_level: Option<ThinkingLevel>,
}

/// The required selectors of a request, resolved after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    pub mode: OperationMode,
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionQuality,
    pub thinking_level: ThinkingLevel,
}

impl GenerateImageRequest {
    /// Convenience constructor used by callers that build requests in code.
    pub fn new(subject: impl Into<String>, mode: OperationMode) -> Self {
        Self {
            subject: subject.into(),
            operation_mode: Some(mode),
            ..Default::default()
        }
    }

    /// Validate every field and resolve the required selectors.
    ///
    /// All violations are collected, not just the first one.
    pub fn validated(&self) -> Result<GenerationSettings, GenerationError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };

        if let Some(mode) = self.operation_mode {
            let has_source = self
                .source_image_base64
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
            if mode.needs_source_image() && !has_source {
                errors.push(FieldError::new(
                    "sourceImageBase64",
                    format!("Source image is required for {mode}"),
                ));
            }
        }

        match (
            self.operation_mode,
            self.aspect_ratio,
            self.resolution,
            self.thinking_level,
        ) {
            (Some(mode), Some(aspect_ratio), Some(resolution), Some(thinking_level))
                if errors.is_empty() =>
            {
                Ok(GenerationSettings {
                    mode,
                    aspect_ratio,
                    resolution,
                    thinking_level,
                })
            }
            _ => Err(GenerationError::Validation(errors)),
        }
    }
}

impl EditImageRequest {
    /// Validate the edit-specific constraints.
    pub fn check(&self) -> Result<(), GenerationError> {
        self.validate()
            .map_err(|e| GenerationError::Validation(field_errors(&e)))
    }

    /// Normalise into a generate-style request, filling in defaults for the
    /// sizing and thinking selectors the edit form may omit.
    pub fn into_generate_request(self) -> GenerateImageRequest {
        GenerateImageRequest {
            subject: self.subject,
            operation_mode: self.operation_mode,
            aesthetic_style: self.aesthetic_style,
            lighting: self.lighting,
            style_intensity: self.style_intensity,
            aspect_ratio: Some(self.aspect_ratio.unwrap_or(AspectRatio::Ratio1x1)),
            resolution: Some(self.resolution.unwrap_or(ResolutionQuality::Standard)),
            thinking_level: Some(self.thinking_level.unwrap_or(ThinkingLevel::Creative)),
            source_image_base64: Some(self.source_image_base64),
            ..Default::default()
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Flatten validator output into wire-named field errors, sorted by field.
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(field.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
