//! Conversational edits of an existing photograph.

use crate::backend::{ContentPart, GenerativeBackend};
use crate::config::DEFAULT_EDIT_TIMEOUT;
use crate::error::{BackendError, PlatecamError, Result};
use crate::image::EncodedImage;
use std::sync::Arc;
use std::time::Duration;

/// Applies free-text edit instructions to an image.
#[derive(Clone)]
pub struct ImageEditor {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl ImageEditor {
    /// Creates an editor over `backend` with the default timeout.
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_EDIT_TIMEOUT,
        }
    }

    /// Sets the deadline for each edit call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Edits `image` according to `instruction` and returns the new image.
    ///
    /// Fails with [`PlatecamError::NoEditedImage`] when the call succeeds but
    /// returns no image part, and with [`PlatecamError::Edit`] when the call
    /// itself fails.
    pub async fn edit_image(&self, image: &EncodedImage, instruction: &str) -> Result<EncodedImage> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PlatecamError::Validation(
                "Please describe the edit you want to make.".into(),
            ));
        }

        tracing::debug!(
            mime_type = image.mime_type(),
            size = image.size(),
            "requesting image edit"
        );

        let parts = tokio::time::timeout(self.timeout, self.backend.edit_image(image, instruction))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))
            .and_then(|r| r)
            .map_err(|e| {
                tracing::warn!(error = %e, "image edit failed");
                PlatecamError::edit(e)
            })?;

        first_inline_image(parts).ok_or_else(|| {
            tracing::warn!("image edit returned no image part");
            PlatecamError::NoEditedImage
        })
    }

    /// Edits an image given as a `data:` URL, returning a `data:` URL.
    pub async fn edit_data_url(&self, data_url: &str, instruction: &str) -> Result<String> {
        let image = EncodedImage::from_data_url(data_url)
            .map_err(|e| PlatecamError::Validation(format!("Invalid image data: {e}")))?;
        Ok(self.edit_image(&image, instruction).await?.to_data_url())
    }
}

fn first_inline_image(parts: Vec<ContentPart>) -> Option<EncodedImage> {
    parts.into_iter().find_map(|part| match part {
        ContentPart::InlineImage(image) => Some(image),
        ContentPart::Text(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{EditScript, FakeBackend};
    use crate::image::ImageFormat;
    use std::sync::atomic::Ordering;

    fn original() -> EncodedImage {
        EncodedImage::new(ImageFormat::Jpeg, vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
    }

    fn edited() -> EncodedImage {
        EncodedImage::new(ImageFormat::Png, vec![9, 9, 9])
    }

    #[tokio::test]
    async fn test_returns_first_inline_image() {
        let fake = FakeBackend::new().with_edit_script(EditScript::Parts(vec![
            ContentPart::Text("Here you go".into()),
            ContentPart::InlineImage(edited()),
            ContentPart::InlineImage(original()),
        ]));
        let editor = ImageEditor::new(Arc::new(fake));

        let image = editor.edit_image(&original(), "add steam").await.unwrap();
        assert_eq!(image, edited());
    }

    #[tokio::test]
    async fn test_no_image_part_is_distinct() {
        let fake = FakeBackend::new()
            .with_edit_script(EditScript::Parts(vec![ContentPart::Text("I can't".into())]));
        let editor = ImageEditor::new(Arc::new(fake));

        let err = editor.edit_image(&original(), "add steam").await.unwrap_err();
        assert!(matches!(err, PlatecamError::NoEditedImage));
        assert!(err.is_edit());
    }

    #[tokio::test]
    async fn test_transport_failure_is_edit_error() {
        let fake = FakeBackend::new().with_edit_script(EditScript::Fail("boom".into()));
        let editor = ImageEditor::new(Arc::new(fake));

        let err = editor.edit_image(&original(), "add steam").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Edit(_)));
        assert!(err.is_edit());
    }

    #[tokio::test]
    async fn test_empty_instruction_rejected_before_call() {
        let fake = Arc::new(FakeBackend::new());
        let editor = ImageEditor::new(fake.clone());

        let err = editor.edit_image(&original(), "   ").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Validation(_)));
        assert_eq!(fake.edit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_edit_data_url() {
        let fake = FakeBackend::new()
            .with_edit_script(EditScript::Parts(vec![ContentPart::InlineImage(edited())]));
        let editor = ImageEditor::new(Arc::new(fake));

        let url = editor
            .edit_data_url(&original().to_data_url(), "make it black and white")
            .await
            .unwrap();
        assert_eq!(url, edited().to_data_url());

        let err = editor.edit_data_url("garbage", "x").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Validation(_)));
    }
}
