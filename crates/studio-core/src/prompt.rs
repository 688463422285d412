//! Prompt composition.
//!
//! A prompt is the subject followed by the fragments of an explicit,
//! statically ordered list of contributors.  Each contributor looks at one
//! optional request field and either returns a clause or nothing.  New
//! fragment categories are added by appending a new entry to
//! [`CONTRIBUTORS`]; existing contributors are never touched.

use tracing::info;

use crate::request::GenerateImageRequest;

/// One fragment source: `(request) -> optional clause`.
pub type Contributor = fn(&GenerateImageRequest) -> Option<String>;

/// Contributors in prompt order.  The subject always comes first and is not
/// part of this list.
pub const CONTRIBUTORS: &[(&str, Contributor)] = &[
    ("aesthetic_style", aesthetic_style),
    ("lighting", lighting),
    ("camera_composition", camera_composition),
    ("color_palette", color_palette),
    ("lens_effect", lens_effect),
    ("resolution", resolution),
];

fn aesthetic_style(req: &GenerateImageRequest) -> Option<String> {
    let fragment = req.aesthetic_style?.descriptor().fragment?;
    Some(format!("rendered in a {fragment} aesthetic"))
}

fn lighting(req: &GenerateImageRequest) -> Option<String> {
    let fragment = req.lighting?.descriptor().fragment?;
    Some(format!("illuminated with {fragment} lighting"))
}

fn camera_composition(req: &GenerateImageRequest) -> Option<String> {
    let fragment = req.camera_composition?.descriptor().fragment?;
    Some(format!("shot from a {fragment} perspective"))
}

fn color_palette(req: &GenerateImageRequest) -> Option<String> {
    let fragment = req.color_palette?.descriptor().fragment?;
    Some(format!("utilizing a {fragment} color palette"))
}

fn lens_effect(req: &GenerateImageRequest) -> Option<String> {
    let fragment = req.lens_effect?.descriptor().fragment?;
    Some(format!("featuring {fragment} photography techniques"))
}

fn resolution(req: &GenerateImageRequest) -> Option<String> {
    let label = req.resolution?.label();
    Some(format!("highly detailed, {label} resolution"))
}

/// Renders requests into prompt strings.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    contributors: &'static [(&'static str, Contributor)],
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            contributors: CONTRIBUTORS,
        }
    }
}

impl PromptComposer {
    /// Compose without logging.  Pure: identical input gives an identical
    /// string.
    pub fn render(&self, request: &GenerateImageRequest) -> String {
        let fragments: Vec<String> = self
            .contributors
            .iter()
            .filter_map(|(_, contribute)| contribute(request))
            .collect();

        if fragments.is_empty() {
            request.subject.clone()
        } else {
            format!("{}, {}", request.subject, fragments.join(", "))
        }
    }

    /// Compose and log the result.
    pub fn compose(&self, request: &GenerateImageRequest) -> String {
        let prompt = self.render(request);
        info!(contributors = self.contributors.len(), prompt = %prompt, "composed prompt");
        prompt
    }
}
