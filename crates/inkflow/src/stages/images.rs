//! Image planning and partial-failure tolerant generation.

use async_trait::async_trait;
use log::{debug, warn};

use crate::brand::ImageDefaults;
use crate::content::{Brief, Image, ImageSpec};
use crate::error::StageError;

use super::{ImageGenerator, ImageProvider};

pub const HERO_PLACEMENT: &str = "hero";

/// Turns a brief into the list of images to render, hero first.
///
/// The list never exceeds `defaults.max_images`.
pub fn plan_images(brief: &Brief, defaults: &ImageDefaults) -> Vec<ImageSpec> {
    let mut specs = Vec::new();

    if defaults.include_hero {
        let description = if brief.summary.is_empty() {
            brief.topic.clone()
        } else {
            brief.summary.clone()
        };
        specs.push(ImageSpec {
            placement: HERO_PLACEMENT.to_string(),
            prompt: styled(&description, defaults),
            alt: brief.topic.clone(),
        });
    }

    for suggestion in &brief.image_suggestions {
        if defaults.include_hero && suggestion.placement == HERO_PLACEMENT {
            continue;
        }
        specs.push(ImageSpec {
            placement: suggestion.placement.clone(),
            prompt: styled(&suggestion.description, defaults),
            alt: suggestion.description.clone(),
        });
    }

    specs.truncate(defaults.max_images);
    specs
}

fn styled(description: &str, defaults: &ImageDefaults) -> String {
    match defaults.style.as_deref() {
        Some(style) if !style.is_empty() => format!("{}. Style: {}", description, style),
        _ => description.to_string(),
    }
}

/// Image stage that renders each planned image independently.
///
/// A failed render is skipped. The stage only fails when every planned
/// image failed, which is taken to mean the provider is down.
pub struct PlannedImageGenerator<P> {
    provider: P,
}

impl<P: ImageProvider> PlannedImageGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: ImageProvider> ImageGenerator for PlannedImageGenerator<P> {
    async fn generate_images(
        &self,
        brief: &Brief,
        defaults: &ImageDefaults,
    ) -> Result<Vec<Image>, StageError> {
        let specs = plan_images(brief, defaults);
        if specs.is_empty() {
            debug!("No images planned for '{}'", brief.topic);
            return Ok(Vec::new());
        }

        let mut images = Vec::with_capacity(specs.len());
        let mut last_error = None;
        for spec in &specs {
            match self.provider.render(spec, defaults).await {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!("Skipping image '{}': {}", spec.placement, e);
                    last_error = Some(e);
                }
            }
        }

        if images.is_empty() {
            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(StageError::Unavailable(format!(
                "all {} images failed: {}",
                specs.len(),
                reason
            )));
        }

        debug!("Generated {}/{} images", images.len(), specs.len());
        Ok(images)
    }
}
