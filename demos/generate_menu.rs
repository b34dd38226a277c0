//! Photographs every dish on the bundled example menu.
//!
//! Run with: `cargo run --example generate_menu`
//!
//! Requires `GEMINI_API_KEY` environment variable.

use platecam::{GeminiBackend, PhotoStyle, Settings, Studio, EXAMPLE_MENU};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    let backend = GeminiBackend::from_settings(settings.clone())?;
    let mut studio = Studio::from_settings(Arc::new(backend), &settings);

    let images = studio
        .request_generation(EXAMPLE_MENU, PhotoStyle::RusticDark)
        .await?;

    for image in images {
        let path = image.suggested_file_name();
        image.image.save(&path)?;
        println!("{} -> {} ({} bytes)", image.dish_name, path, image.image.size());
    }

    Ok(())
}
