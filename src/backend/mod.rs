//! Generative backend seam.
//!
//! The backend is consumed as a black box: structured text extraction,
//! text-to-image synthesis and image-conditioned editing. [`GeminiBackend`]
//! talks to the Google Generative Language API; tests use a scripted fake.

mod gemini;

#[cfg(test)]
pub(crate) mod fake;

pub use gemini::{GeminiBackend, GeminiBackendBuilder};

use crate::error::BackendError;
use crate::image::{AspectRatio, EncodedImage, ImageFormat};
use async_trait::async_trait;
use serde_json::Value;

/// Result type for raw backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Options for a text-to-image call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Number of images to request.
    pub count: u32,
    /// Output encoding.
    pub format: ImageFormat,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            count: 1,
            format: ImageFormat::Jpeg,
            aspect_ratio: AspectRatio::Standard,
        }
    }
}

/// One part of an image-editing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Text commentary from the model.
    Text(String),
    /// An inline image payload.
    InlineImage(EncodedImage),
}

/// Trait for generative AI backends.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Sends `prompt` with a JSON schema constraint and returns the raw JSON text.
    async fn generate_json(&self, prompt: &str, schema: &Value) -> BackendResult<String>;

    /// Synthesizes images from `prompt`, returning zero or more raw payloads.
    async fn generate_images(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> BackendResult<Vec<Vec<u8>>>;

    /// Sends `image` with `instruction`, restricted to image output.
    async fn edit_image(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> BackendResult<Vec<ContentPart>>;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str;

    /// Checks if the backend is reachable and authenticated.
    async fn health_check(&self) -> BackendResult<()>;
}
