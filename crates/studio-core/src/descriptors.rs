//! Static descriptor tables for every selectable option.
//!
//! Each enumerated option maps to a plain [`Descriptor`] record held in a
//! `const` table indexed by the variant's discriminant, so fragment lookup is
//! a single array index and can never fail for a well-typed value.  Unknown
//! keys never reach this module: they are rejected when the request body is
//! deserialised.

use serde::{Deserialize, Serialize};
use strum::EnumIter;
use utoipa::ToSchema;

/// Display data for one option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Wire key, e.g. `"PHOTOREALISTIC"`.
    pub key: &'static str,
    /// Human-readable label shown in client dropdowns.
    pub label: &'static str,
    /// Prompt fragment; `None` for options that never reach the prompt.
    pub fragment: Option<&'static str>,
}

/// Declares an option enum together with its descriptor table.
///
/// Variants are listed in table order; the table is indexed by `self as usize`
/// so the two can never drift apart.
macro_rules! descriptor_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $table:ident {
            $( $variant:ident => ($key:literal, $label:literal $(, $fragment:literal)?) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumIter,
        )]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        const $table: &[Descriptor] = &[
            $(
                Descriptor {
                    key: $key,
                    label: $label,
                    fragment: descriptor_table!(@fragment $($fragment)?),
                },
            )+
        ];

        impl $name {
            /// The static descriptor record for this value.
            pub fn descriptor(self) -> &'static Descriptor {
                &$table[self as usize]
            }

            pub fn key(self) -> &'static str {
                self.descriptor().key
            }

            pub fn label(self) -> &'static str {
                self.descriptor().label
            }

            /// All values in declaration order.
            pub fn all() -> impl Iterator<Item = Self> {
                <Self as strum::IntoEnumIterator>::iter()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.key())
            }
        }
    };
    (@fragment $fragment:literal) => { Some($fragment) };
    (@fragment) => { None };
}

descriptor_table! {
    /// The discrete generation workflow requested by the caller.
    pub enum OperationMode in OPERATION_MODES {
        TextToImage => ("TEXT_TO_IMAGE", "Generate New"),
        EditExisting => ("EDIT_EXISTING", "Edit Existing"),
        StyleTransfer => ("STYLE_TRANSFER", "Style Transfer"),
        MultiImage => ("MULTI_IMAGE", "Multi-Image Composition"),
    }
}

impl OperationMode {
    /// Whether the mode works from a caller-supplied source image.
    pub fn needs_source_image(self) -> bool {
        matches!(self, OperationMode::EditExisting | OperationMode::StyleTransfer)
    }
}

descriptor_table! {
    pub enum AestheticStyle in AESTHETIC_STYLES {
        Photorealistic => ("PHOTOREALISTIC", "Photorealistic", "photorealistic"),
        Isometric3d => ("ISOMETRIC_3D", "Isometric 3D", "isometric 3D rendered"),
        FlatVector => ("FLAT_VECTOR", "Flat Vector", "flat vector illustration"),
        Cinematic => ("CINEMATIC", "Cinematic", "cinematic film still"),
        Cyberpunk => ("CYBERPUNK", "Cyberpunk", "cyberpunk neon-drenched"),
        Watercolor => ("WATERCOLOR", "Watercolor", "traditional watercolor painting"),
        Sketch => ("SKETCH", "Sketch", "detailed charcoal sketch"),
        PopArt => ("POP_ART", "Pop Art", "bold pop art"),
    }
}

descriptor_table! {
    pub enum LightingSetup in LIGHTING_SETUPS {
        GoldenHour => ("GOLDEN_HOUR", "Natural/Golden Hour", "natural golden hour"),
        StudioSoftbox => ("STUDIO_SOFTBOX", "Studio Softbox", "studio softbox"),
        NeonVolumetric => ("NEON_VOLUMETRIC", "Neon Volumetric", "neon volumetric"),
        HighContrast => ("HIGH_CONTRAST", "High Contrast/Moody", "high contrast moody"),
        HarshSunlight => ("HARSH_SUNLIGHT", "Harsh Sunlight", "harsh direct sunlight"),
    }
}

descriptor_table! {
    pub enum CameraComposition in CAMERA_COMPOSITIONS {
        Macro => ("MACRO", "Macro (Extreme Close-up)", "extreme macro close-up"),
        WideAngle => ("WIDE_ANGLE", "Wide Angle", "wide angle"),
        DroneAerial => ("DRONE_AERIAL", "Drone/Aerial View", "drone aerial view"),
        EyeLevel => ("EYE_LEVEL", "Eye-Level", "eye-level"),
        Isometric => ("ISOMETRIC", "Isometric Angle", "isometric angle"),
    }
}

descriptor_table! {
    pub enum ColorPalette in COLOR_PALETTES {
        Vibrant => ("VIBRANT", "Vibrant/Saturated", "vibrant saturated"),
        Muted => ("MUTED", "Muted/Pastel", "muted pastel"),
        Monochromatic => ("MONOCHROMATIC", "Monochromatic", "monochromatic"),
        Sepia => ("SEPIA", "Sepia", "sepia-toned"),
        HighContrastBw => ("HIGH_CONTRAST_BW", "High Contrast Black & White", "high contrast black and white"),
    }
}

descriptor_table! {
    pub enum LensEffect in LENS_EFFECTS {
        DeepFocus => ("DEEP_FOCUS", "Deep Focus", "deep focus sharp"),
        ShallowDof => ("SHALLOW_DOF", "Shallow Depth of Field", "shallow depth of field bokeh"),
        MotionBlur => ("MOTION_BLUR", "Motion Blur", "motion blur"),
        Fisheye => ("FISHEYE", "Fisheye", "fisheye distortion"),
    }
}

descriptor_table! {
    pub enum AspectRatio in ASPECT_RATIOS {
        Ratio1x1 => ("RATIO_1_1", "1:1 (Square)"),
        Ratio16x9 => ("RATIO_16_9", "16:9 (Landscape)"),
        Ratio9x16 => ("RATIO_9_16", "9:16 (Vertical)"),
        Ratio4x3 => ("RATIO_4_3", "4:3 (Standard)"),
        Ratio21x9 => ("RATIO_21_9", "21:9 (Cinematic)"),
    }
}

impl AspectRatio {
    /// Provider-facing value, e.g. `"16:9"`.
    pub fn api_value(self) -> &'static str {
        match self {
            AspectRatio::Ratio1x1 => "1:1",
            AspectRatio::Ratio16x9 => "16:9",
            AspectRatio::Ratio9x16 => "9:16",
            AspectRatio::Ratio4x3 => "4:3",
            AspectRatio::Ratio21x9 => "21:9",
        }
    }
}

descriptor_table! {
    pub enum ResolutionQuality in RESOLUTIONS {
        Draft => ("DRAFT", "Draft"),
        Standard => ("STANDARD", "Standard"),
        Production => ("PRODUCTION", "Production"),
    }
}

impl ResolutionQuality {
    /// Output size in pixels as `(width, height)`.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ResolutionQuality::Draft => (512, 512),
            ResolutionQuality::Standard => (1024, 1024),
            ResolutionQuality::Production => (2048, 2048),
        }
    }
}

descriptor_table! {
    pub enum ThinkingLevel in THINKING_LEVELS {
        Fast => ("FAST", "Fast"),
        Creative => ("CREATIVE", "Creative"),
    }
}

impl ThinkingLevel {
    pub fn api_value(self) -> &'static str {
        match self {
            ThinkingLevel::Fast => "minimal",
            ThinkingLevel::Creative => "high",
        }
    }
}

descriptor_table! {
    pub enum StyleIntensity in STYLE_INTENSITIES {
        Subtle => ("SUBTLE", "Subtle"),
        Balanced => ("BALANCED", "Balanced"),
        Aggressive => ("AGGRESSIVE", "Aggressive"),
    }
}

impl StyleIntensity {
    /// Blend weight in `0.0..=1.0`.
    pub fn weight(self) -> f64 {
        match self {
            StyleIntensity::Subtle => 0.3,
            StyleIntensity::Balanced => 0.6,
            StyleIntensity::Aggressive => 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_index_matches_variant_key() {
        for style in AestheticStyle::all() {
            let json = serde_json::to_value(style).unwrap();
            assert_eq!(json, style.key());
        }
        for mode in OperationMode::all() {
            let json = serde_json::to_value(mode).unwrap();
            assert_eq!(json, mode.key());
        }
        assert_eq!(LensEffect::Fisheye.key(), "FISHEYE");
        assert_eq!(ColorPalette::HighContrastBw.key(), "HIGH_CONTRAST_BW");
    }

    #[test]
    fn prompt_affecting_tables_carry_fragments() {
        assert!(AestheticStyle::all().all(|v| v.descriptor().fragment.is_some()));
        assert!(LightingSetup::all().all(|v| v.descriptor().fragment.is_some()));
        assert!(CameraComposition::all().all(|v| v.descriptor().fragment.is_some()));
        assert!(ColorPalette::all().all(|v| v.descriptor().fragment.is_some()));
        assert!(LensEffect::all().all(|v| v.descriptor().fragment.is_some()));
        assert!(AspectRatio::all().all(|v| v.descriptor().fragment.is_none()));
    }

    #[test]
    fn unknown_key_is_rejected_at_deserialisation() {
        let err = serde_json::from_str::<AestheticStyle>("\"BAROQUE\"");
        assert!(err.is_err());
        let ok: AspectRatio = serde_json::from_str("\"RATIO_16_9\"").unwrap();
        assert_eq!(ok.api_value(), "16:9");
    }

    #[test]
    fn resolution_and_intensity_values() {
        assert_eq!(ResolutionQuality::Standard.dimensions(), (1024, 1024));
        assert_eq!(ResolutionQuality::Production.label(), "Production");
        assert_eq!(ThinkingLevel::Fast.api_value(), "minimal");
        assert!((StyleIntensity::Balanced.weight() - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn only_image_modes_need_source() {
        assert!(!OperationMode::TextToImage.needs_source_image());
        assert!(OperationMode::EditExisting.needs_source_image());
        assert!(OperationMode::StyleTransfer.needs_source_image());
        assert!(!OperationMode::MultiImage.needs_source_image());
    }
}
