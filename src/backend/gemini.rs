//! Gemini / Imagen backend over the Google Generative Language REST API.

use crate::backend::{BackendResult, ContentPart, GenerativeBackend, ImageOptions};
use crate::config::{self, Settings};
use crate::error::{parse_retry_after, sanitize_error_message, BackendError};
use crate::image::EncodedImage;
use async_trait::async_trait;
use base64::Engine;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Builder for GeminiBackend.
#[derive(Debug, Clone)]
pub struct GeminiBackendBuilder {
    settings: Settings,
}

impl Default for GeminiBackendBuilder {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
        }
    }
}

impl GeminiBackendBuilder {
    /// Creates a new builder with default settings and no key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.api_key = Some(key.into());
        self
    }

    /// Sets the structured-text model.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.settings.text_model = model.into();
        self
    }

    /// Sets the text-to-image model.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.settings.image_model = model.into();
        self
    }

    /// Sets the image-editing model.
    pub fn edit_model(mut self, model: impl Into<String>) -> Self {
        self.settings.edit_model = model.into();
        self
    }

    /// Sets the API root URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builds the backend.
    ///
    /// A missing key is not an error here; calls fail with
    /// [`BackendError::NotConfigured`] instead.
    pub fn build(self) -> BackendResult<GeminiBackend> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("platecam/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GeminiBackend {
            client,
            settings: self.settings,
        })
    }
}

/// Gemini / Imagen backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    settings: Settings,
}

impl GeminiBackend {
    /// Creates a new `GeminiBackendBuilder`.
    pub fn builder() -> GeminiBackendBuilder {
        GeminiBackendBuilder::new()
    }

    /// Builds a backend from settings.
    pub fn from_settings(settings: Settings) -> BackendResult<Self> {
        Self::builder().settings(settings).build()
    }

    fn api_key(&self) -> BackendResult<&str> {
        self.settings.api_key.as_deref().ok_or_else(|| {
            BackendError::NotConfigured(format!(
                "API key is not configured. Set {} to use the photo service.",
                config::API_KEY_ENV_VARS[0]
            ))
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.settings.base_url, model, method)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, url: &str, body: &B) -> BackendResult<R> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> BackendError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return BackendError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return BackendError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return BackendError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return BackendError::ContentBlocked(text);
    }
    BackendError::Api {
        status,
        message: text,
    }
}

/// Returns the first candidate after checking prompt and finish-reason blocks.
fn first_candidate(response: GeminiResponse) -> BackendResult<GeminiCandidate> {
    // Blocks come back as HTTP 200
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(BackendError::ContentBlocked(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        BackendError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(BackendError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            _ => {} // STOP, MAX_TOKENS, NO_IMAGE etc. are judged by the caller
        }
    }

    Ok(candidate)
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate_json(&self, prompt: &str, schema: &Value) -> BackendResult<String> {
        let start = Instant::now();
        let url = self.model_url(&self.settings.text_model, "generateContent");
        let body = GeminiRequest::structured(prompt, schema);

        let response: GeminiResponse = self.post(&url, &body).await?;
        let candidate = first_candidate(response)?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        tracing::debug!(
            model = %self.settings.text_model,
            duration_ms = start.elapsed().as_millis() as u64,
            bytes = text.len(),
            "structured generation complete"
        );
        Ok(text)
    }

    async fn generate_images(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> BackendResult<Vec<Vec<u8>>> {
        let start = Instant::now();
        let url = self.model_url(&self.settings.image_model, "predict");
        let body = ImagenRequest::new(prompt, options);

        let response: ImagenResponse = self.post(&url, &body).await?;

        let mut images = Vec::with_capacity(response.predictions.len());
        for prediction in response.predictions {
            if let Some(reason) = prediction.rai_filtered_reason {
                tracing::debug!(%reason, "imagen prediction filtered");
                continue;
            }
            if let Some(b64) = prediction.bytes_base64_encoded {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(&b64)
                    .map_err(|e| BackendError::Decode(e.to_string()))?;
                images.push(data);
            }
        }

        tracing::debug!(
            model = %self.settings.image_model,
            duration_ms = start.elapsed().as_millis() as u64,
            count = images.len(),
            "image generation complete"
        );
        Ok(images)
    }

    async fn edit_image(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> BackendResult<Vec<ContentPart>> {
        let start = Instant::now();
        let url = self.model_url(&self.settings.edit_model, "generateContent");
        let body = GeminiRequest::image_edit(image, instruction);

        let response: GeminiResponse = self.post(&url, &body).await?;
        let candidate = first_candidate(response)?;

        let mut parts = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(inline) = part.inline_data {
                parts.push(ContentPart::InlineImage(EncodedImage::from_base64(
                    &inline.mime_type,
                    &inline.data,
                )?));
            } else if let Some(text) = part.text {
                parts.push(ContentPart::Text(text));
            }
        }

        tracing::debug!(
            model = %self.settings.edit_model,
            duration_ms = start.elapsed().as_millis() as u64,
            parts = parts.len(),
            "image edit complete"
        );
        Ok(parts)
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> BackendResult<()> {
        let api_key = self.api_key()?;

        for model in [
            &self.settings.text_model,
            &self.settings.image_model,
            &self.settings.edit_model,
        ] {
            let url = format!("{}/models/{}", self.settings.base_url, model);
            let response = self
                .client
                .get(&url)
                .header("x-goog-api-key", api_key)
                .send()
                .await?;

            match response.status().as_u16() {
                401 | 403 => return Err(BackendError::Auth("Invalid API key".into())),
                404 => {
                    return Err(BackendError::InvalidRequest(format!(
                        "Model {model} not found. Verify the model name is correct."
                    )))
                }
                s if !(200..300).contains(&s) => {
                    return Err(BackendError::Api {
                        status: s,
                        message: "Health check failed".into(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

impl GeminiRequest {
    fn structured(prompt: &str, schema: &Value) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiRequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                ..GeminiConfig::default()
            },
        }
    }

    fn image_edit(image: &EncodedImage, instruction: &str) -> Self {
        // Image first, then the instruction
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.to_base64(),
                },
            },
            GeminiRequestPart::Text {
                text: instruction.to_string(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                ..GeminiConfig::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

// Imagen :predict wire format
#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: ImagenOutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenOutputOptions {
    mime_type: String,
}

impl ImagenRequest {
    fn new(prompt: &str, options: &ImageOptions) -> Self {
        Self {
            instances: vec![ImagenInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImagenParameters {
                sample_count: options.count,
                aspect_ratio: options.aspect_ratio.as_str().to_string(),
                output_options: ImagenOutputOptions {
                    mime_type: options.format.mime_type().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}
