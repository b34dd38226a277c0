//! Dish + style to a single food photograph.

use crate::backend::{GenerativeBackend, ImageOptions};
use crate::config::DEFAULT_GENERATION_TIMEOUT;
use crate::error::{BackendError, PlatecamError, Result};
use crate::image::{EncodedImage, ImageFormat};
use crate::menu::Dish;
use crate::photo::PhotoStyle;
use std::sync::Arc;
use std::time::Duration;

const PROMPT_PREFIX: &str = "Professional, ultra-realistic, high-end food photography of";

/// Builds the text-to-image prompt for a dish in a style.
pub fn build_prompt(dish: &Dish, style: PhotoStyle) -> String {
    compose_prompt(dish, style.prompt_suffix())
}

fn compose_prompt(dish: &Dish, suffix: &str) -> String {
    let prompt = format!(
        "{PROMPT_PREFIX} {}: {}. {}",
        dish.name, dish.description, suffix
    );
    prompt.trim_end().to_string()
}

/// Generates one photograph per call.
#[derive(Clone)]
pub struct ImageGenerator {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
    options: ImageOptions,
}

impl ImageGenerator {
    /// Creates a generator requesting one 4:3 JPEG per dish.
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_GENERATION_TIMEOUT,
            options: ImageOptions::default(),
        }
    }

    /// Sets the deadline for each generation call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generates a photograph of `dish` in `style`.
    pub async fn generate_image(&self, dish: &Dish, style: PhotoStyle) -> Result<EncodedImage> {
        let prompt = build_prompt(dish, style);
        tracing::debug!(dish = %dish.name, style = %style.as_str(), "generating image");

        let images = tokio::time::timeout(
            self.timeout,
            self.backend.generate_images(&prompt, &self.options),
        )
        .await
        .map_err(|_| BackendError::Timeout(self.timeout))
        .and_then(|r| r)
        .map_err(|e| {
            tracing::warn!(dish = %dish.name, error = %e, "image generation failed");
            PlatecamError::generation(&dish.name, e)
        })?;

        let data = images.into_iter().next().ok_or_else(|| {
            tracing::warn!(dish = %dish.name, "image generation returned no images");
            PlatecamError::Generation {
                dish: dish.name.clone(),
                reason: "No image was generated.".into(),
            }
        })?;

        Ok(wrap_image(data, self.options.format))
    }
}

/// Tags raw bytes with a format, trusting the payload's magic bytes over the request.
fn wrap_image(data: Vec<u8>, requested: ImageFormat) -> EncodedImage {
    let format = ImageFormat::from_magic_bytes(&data).unwrap_or(requested);
    EncodedImage::new(format, data)
}
