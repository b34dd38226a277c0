//! Menu text to structured dishes.

use crate::backend::GenerativeBackend;
use crate::config::DEFAULT_PARSE_TIMEOUT;
use crate::error::{BackendError, PlatecamError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// A dish identified in menu text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    /// Dish name as printed on the menu.
    pub name: String,
    /// Short description of the dish.
    pub description: String,
}

impl Dish {
    /// Creates a new dish.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// JSON schema the extraction call is constrained to.
pub fn dish_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": {
                    "type": "STRING",
                    "description": "The name of the dish."
                },
                "description": {
                    "type": "STRING",
                    "description": "A brief description of the dish."
                }
            },
            "required": ["name", "description"]
        }
    })
}

fn extraction_prompt(menu_text: &str) -> String {
    format!(
        "Parse the following restaurant menu text into a JSON array of objects. \
         Each object should have a \"name\" and a \"description\" for a dish. \
         Ignore categories, prices, and other non-dish information. Menu: \n\n{menu_text}"
    )
}

/// Extracts dishes from free-form menu text.
#[derive(Clone)]
pub struct MenuParser {
    backend: Arc<dyn GenerativeBackend>,
    timeout: Duration,
}

impl MenuParser {
    /// Creates a parser over `backend` with the default timeout.
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_PARSE_TIMEOUT,
        }
    }

    /// Sets the deadline for the extraction call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parses `menu_text` into dishes.
    ///
    /// An empty list is returned as-is; callers decide whether that is an error.
    /// Malformed or schema-violating output is rejected whole.
    pub async fn parse_menu(&self, menu_text: &str) -> Result<Vec<Dish>> {
        let prompt = extraction_prompt(menu_text);
        let schema = dish_list_schema();

        let text = tokio::time::timeout(self.timeout, self.backend.generate_json(&prompt, &schema))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))
            .and_then(|r| r)
            .map_err(|e| {
                tracing::warn!(error = %e, "menu extraction call failed");
                PlatecamError::parse(e)
            })?;

        let dishes = decode_dishes(&text).map_err(|e| {
            tracing::warn!(error = %e, "menu extraction returned unusable output");
            PlatecamError::parse(e)
        })?;

        tracing::debug!(count = dishes.len(), "menu parsed");
        Ok(dishes)
    }
}

/// Decodes the extraction output, rejecting anything outside the schema.
fn decode_dishes(text: &str) -> std::result::Result<Vec<Dish>, BackendError> {
    let dishes: Vec<Dish> = serde_json::from_str(text.trim())?;

    if let Some(index) = dishes.iter().position(|d| d.name.trim().is_empty()) {
        return Err(BackendError::UnexpectedResponse(format!(
            "dish {index} has an empty name"
        )));
    }

    Ok(dishes
        .into_iter()
        .map(|d| Dish::new(d.name.trim(), d.description.trim()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::{BackendResult, ContentPart, ImageOptions};
    use crate::image::EncodedImage;
    use async_trait::async_trait;

    fn make_parser(fake: FakeBackend) -> MenuParser {
        MenuParser::new(Arc::new(fake))
    }

    #[tokio::test]
    async fn test_parses_dishes() {
        let parser = make_parser(FakeBackend::new().with_menu_json(
            r#"[
                {"name": "Classic Bruschetta", "description": "Toasted baguette with tomatoes."},
                {"name": "Spaghetti Carbonara", "description": "Creamy egg-based sauce."}
            ]"#,
        ));
        let dishes = parser.parse_menu("APPETIZERS\n...").await.unwrap();
        assert_eq!(
            dishes,
            vec![
                Dish::new("Classic Bruschetta", "Toasted baguette with tomatoes."),
                Dish::new("Spaghetti Carbonara", "Creamy egg-based sauce."),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let parser = make_parser(FakeBackend::new().with_menu_json("  []  "));
        assert!(parser.parse_menu("DRINKS").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_json() {
        let parser = make_parser(FakeBackend::new().with_menu_json("Here are your dishes: soup"));
        let err = parser.parse_menu("soup").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Parse(_)));
    }

    #[tokio::test]
    async fn test_rejects_schema_violation() {
        let parser = make_parser(FakeBackend::new().with_menu_json(r#"[{"name": "Soup"}]"#));
        assert!(matches!(
            parser.parse_menu("soup").await,
            Err(PlatecamError::Parse(_))
        ));

        let parser = make_parser(FakeBackend::new().with_menu_json(r#"{"name": "Soup", "description": "x"}"#));
        assert!(matches!(
            parser.parse_menu("soup").await,
            Err(PlatecamError::Parse(_))
        ));

        let parser = make_parser(FakeBackend::new().with_menu_json(r#"[{"name": " ", "description": "x"}]"#));
        assert!(matches!(
            parser.parse_menu("soup").await,
            Err(PlatecamError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_parse_error() {
        let parser = make_parser(FakeBackend::new().with_menu_error(BackendError::Api {
            status: 500,
            message: "boom".into(),
        }));
        let err = parser.parse_menu("soup").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to parse the menu."));
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let parser = make_parser(
            FakeBackend::new().with_menu_error(BackendError::NotConfigured("no key".into())),
        );
        let err = parser.parse_menu("soup").await.unwrap_err();
        assert!(err.is_configuration());
    }

    struct HangingBackend;

    #[async_trait]
    impl GenerativeBackend for HangingBackend {
        async fn generate_json(&self, _prompt: &str, _schema: &Value) -> BackendResult<String> {
            std::future::pending().await
        }

        async fn generate_images(
            &self,
            _prompt: &str,
            _options: &ImageOptions,
        ) -> BackendResult<Vec<Vec<u8>>> {
            std::future::pending().await
        }

        async fn edit_image(
            &self,
            _image: &EncodedImage,
            _instruction: &str,
        ) -> BackendResult<Vec<ContentPart>> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }

        async fn health_check(&self) -> BackendResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_parse_error() {
        let parser = MenuParser::new(Arc::new(HangingBackend)).with_timeout(Duration::from_secs(5));
        let err = parser.parse_menu("soup").await.unwrap_err();
        assert!(matches!(err, PlatecamError::Parse(ref m) if m.contains("timed out")));
    }

    #[test]
    fn test_prompt_includes_menu_and_instructions() {
        let prompt = extraction_prompt("MAINS\nPizza - $15");
        assert!(prompt.contains("MAINS\nPizza - $15"));
        assert!(prompt.contains("Ignore categories, prices"));
    }

    #[test]
    fn test_schema_requires_both_fields() {
        let schema = dish_list_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["required"], json!(["name", "description"]));
    }
}
