//! Descriptor-table dump for client dropdowns.

use serde::Serialize;
use utoipa::ToSchema;

use crate::descriptors::{
    AestheticStyle, AspectRatio, CameraComposition, ColorPalette, Descriptor, LensEffect,
    LightingSetup, OperationMode, ResolutionQuality, StyleIntensity, ThinkingLevel,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OptionItem {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AspectRatioOption {
    pub value: &'static str,
    pub label: &'static str,
    pub api_value: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudioOptions {
    pub operation_modes: Vec<OptionItem>,
    pub aesthetic_styles: Vec<OptionItem>,
    pub lighting_setups: Vec<OptionItem>,
    pub camera_compositions: Vec<OptionItem>,
    pub color_palettes: Vec<OptionItem>,
    pub lens_effects: Vec<OptionItem>,
    pub aspect_ratios: Vec<AspectRatioOption>,
    pub resolutions: Vec<OptionItem>,
    pub style_intensities: Vec<OptionItem>,
    pub thinking_levels: Vec<OptionItem>,
}

fn items<T>(values: impl Iterator<Item = T>, descriptor: fn(T) -> &'static Descriptor) -> Vec<OptionItem> {
    values
        .map(|v| {
            let d = descriptor(v);
            OptionItem {
                value: d.key,
                label: d.label,
            }
        })
        .collect()
}

impl StudioOptions {
    pub fn collect() -> Self {
        Self {
            operation_modes: items(OperationMode::all(), OperationMode::descriptor),
            aesthetic_styles: items(AestheticStyle::all(), AestheticStyle::descriptor),
            lighting_setups: items(LightingSetup::all(), LightingSetup::descriptor),
            camera_compositions: items(CameraComposition::all(), CameraComposition::descriptor),
            color_palettes: items(ColorPalette::all(), ColorPalette::descriptor),
            lens_effects: items(LensEffect::all(), LensEffect::descriptor),
            aspect_ratios: AspectRatio::all()
                .map(|r| AspectRatioOption {
                    value: r.key(),
                    label: r.label(),
                    api_value: r.api_value(),
                })
                .collect(),
            resolutions: items(ResolutionQuality::all(), ResolutionQuality::descriptor),
            style_intensities: items(StyleIntensity::all(), StyleIntensity::descriptor),
            thinking_levels: items(ThinkingLevel::all(), ThinkingLevel::descriptor),
        }
    }
}
