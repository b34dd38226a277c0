//! Error types for menu parsing, photo generation and editing.

use std::time::Duration;

/// Errors raised by a generative backend at the transport level.
///
/// These never reach a session directly: each component converts them into
/// the matching [`PlatecamError`] kind at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No credential was configured, so no request was sent.
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// API key rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The call did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters (including unknown model).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response was well-formed JSON but not the shape we asked for.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced to callers and recorded in the session.
#[derive(Debug, thiserror::Error)]
pub enum PlatecamError {
    /// The backend credential is missing.
    #[error("{0}")]
    Configuration(String),

    /// Caller input was rejected before any backend call.
    #[error("{0}")]
    Validation(String),

    /// Menu text could not be turned into structured dishes.
    #[error("{0}")]
    Parse(String),

    /// The menu parsed cleanly but contained no dishes.
    #[error("No dishes could be identified from your menu.")]
    NoDishes,

    /// Image synthesis failed for one dish.
    #[error("Failed to generate an image for {dish}: {reason}")]
    Generation { dish: String, reason: String },

    /// An edit call failed.
    #[error("{0}")]
    Edit(String),

    /// An edit call succeeded but its response carried no image.
    #[error("Image editing did not return a valid image.")]
    NoEditedImage,

    /// A generation run is already in flight.
    #[error("a generation is already in progress")]
    Busy,

    /// No image with the given id exists in the gallery.
    #[error("no image with id {0}")]
    UnknownImage(String),

    /// I/O error (e.g., saving or reading an image file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatecamError {
    /// Builds a `Generation` error for `dish`, keeping configuration problems distinct.
    pub(crate) fn generation(dish: &str, err: BackendError) -> Self {
        match err {
            BackendError::NotConfigured(msg) => Self::Configuration(msg),
            other => Self::Generation {
                dish: dish.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Builds a `Parse` error, keeping configuration problems distinct.
    pub(crate) fn parse(err: BackendError) -> Self {
        match err {
            BackendError::NotConfigured(msg) => Self::Configuration(msg),
            other => Self::Parse(format!(
                "Failed to parse the menu. Please check the format and try again. ({other})"
            )),
        }
    }

    /// Builds an `Edit` error, keeping configuration problems distinct.
    pub(crate) fn edit(err: BackendError) -> Self {
        match err {
            BackendError::NotConfigured(msg) => Self::Configuration(msg),
            other => Self::Edit(format!("Failed to edit the image. ({other})")),
        }
    }

    /// Returns true for either kind of edit failure.
    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edit(_) | Self::NoEditedImage)
    }

    /// Returns true if this error was caused by a missing credential.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias for platecam operations.
pub type Result<T> = std::result::Result<T, PlatecamError>;

/// Maximum length of an API error body kept in an error message.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Redacts anything resembling an API key and truncates long error bodies.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let trimmed = word.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            if trimmed.starts_with("AIza") && trimmed.len() >= 30 {
                word.replace(trimmed, "[REDACTED]")
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_BODY_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Parses a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_stays_configuration() {
        let err = PlatecamError::generation("Soup", BackendError::NotConfigured("no key".into()));
        assert!(err.is_configuration());

        let err = PlatecamError::parse(BackendError::NotConfigured("no key".into()));
        assert!(err.is_configuration());

        let err = PlatecamError::edit(BackendError::NotConfigured("no key".into()));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_generation_error_names_dish() {
        let err = PlatecamError::generation(
            "Spaghetti Carbonara",
            BackendError::UnexpectedResponse("no images".into()),
        );
        assert!(err.to_string().contains("Spaghetti Carbonara"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = BackendError::Api {
            status: 500,
            message: "Internal".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - Internal");

        assert_eq!(
            PlatecamError::NoDishes.to_string(),
            "No dishes could be identified from your menu."
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = "API key AIzaSyA1234567890abcdefghijklmnopqrstu is invalid";
        let clean = sanitize_error_message(msg);
        assert!(!clean.contains("AIzaSy"));
        assert!(clean.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2000);
        let clean = sanitize_error_message(&long);
        assert!(clean.len() < 600);
        assert!(clean.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}
