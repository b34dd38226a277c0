//! Runtime settings: credential, model names and per-call timeouts.

use std::time::Duration;

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Default model for structured menu extraction.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Default text-to-image model.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
/// Default image-editing model.
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout for a menu parse call.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for a single dish's image generation.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Timeout for a single edit call.
pub const DEFAULT_EDIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Runtime settings.
#[derive(Clone)]
pub struct Settings {
    /// Backend credential. `None` leaves every backend call failing as "not configured".
    pub api_key: Option<String>,
    /// Model used to extract dishes from menu text.
    pub text_model: String,
    /// Model used for text-to-image generation.
    pub image_model: String,
    /// Model used for image editing.
    pub edit_model: String,
    /// API root URL.
    pub base_url: String,
    /// Deadline for the menu parse call.
    pub parse_timeout: Duration,
    /// Deadline for each image generation call.
    pub generation_timeout: Duration,
    /// Deadline for each edit call.
    pub edit_timeout: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("edit_model", &self.edit_model)
            .field("base_url", &self.base_url)
            .field("parse_timeout", &self.parse_timeout)
            .field("generation_timeout", &self.generation_timeout)
            .field("edit_timeout", &self.edit_timeout)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            parse_timeout: DEFAULT_PARSE_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            edit_timeout: DEFAULT_EDIT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Never fails: a missing key is recorded as `None` and reported when a call is made.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self {
            api_key: resolve_api_key(&lookup),
            ..Self::default()
        };

        if let Some(model) = non_empty(lookup("PLATECAM_TEXT_MODEL")) {
            settings.text_model = model;
        }
        if let Some(model) = non_empty(lookup("PLATECAM_IMAGE_MODEL")) {
            settings.image_model = model;
        }
        if let Some(model) = non_empty(lookup("PLATECAM_EDIT_MODEL")) {
            settings.edit_model = model;
        }
        if let Some(url) = non_empty(lookup("PLATECAM_BASE_URL")) {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = non_empty(lookup("PLATECAM_TIMEOUT_SECS")) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings = settings.with_timeout(Duration::from_secs(secs)),
                _ => tracing::warn!(value = %raw, "ignoring invalid PLATECAM_TIMEOUT_SECS"),
            }
        }

        if settings.api_key.is_none() {
            tracing::warn!(
                "no API key found in {}; backend calls will fail until one is set",
                API_KEY_ENV_VARS.join(", ")
            );
        }

        settings
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Applies one timeout to parse, generation and edit calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.parse_timeout = timeout;
        self.generation_timeout = timeout;
        self.edit_timeout = timeout;
        self
    }

    /// Returns true if a credential is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn resolve_api_key(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| non_empty(lookup(name)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert!(!settings.is_configured());
        assert_eq!(settings.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(settings.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(settings.edit_model, DEFAULT_EDIT_MODEL);
        assert_eq!(settings.generation_timeout, DEFAULT_GENERATION_TIMEOUT);
    }

    #[test]
    fn test_api_key_precedence() {
        let settings =
            Settings::from_lookup(lookup(&[("API_KEY", "c"), ("GOOGLE_API_KEY", "b")]));
        assert_eq!(settings.api_key.as_deref(), Some("b"));

        let settings = Settings::from_lookup(lookup(&[("GEMINI_API_KEY", "  "), ("API_KEY", "c")]));
        assert_eq!(settings.api_key.as_deref(), Some("c"));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("PLATECAM_IMAGE_MODEL", "imagen-4.0-fast-generate-001"),
            ("PLATECAM_BASE_URL", "http://localhost:8080/"),
            ("PLATECAM_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(settings.image_model, "imagen-4.0-fast-generate-001");
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.parse_timeout, Duration::from_secs(5));
        assert_eq!(settings.edit_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_timeout_ignored() {
        let settings = Settings::from_lookup(lookup(&[("PLATECAM_TIMEOUT_SECS", "soon")]));
        assert_eq!(settings.parse_timeout, DEFAULT_PARSE_TIMEOUT);

        let settings = Settings::from_lookup(lookup(&[("PLATECAM_TIMEOUT_SECS", "0")]));
        assert_eq!(settings.parse_timeout, DEFAULT_PARSE_TIMEOUT);
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = Settings::default().with_api_key("secret-key");
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret-key"));
    }
}
