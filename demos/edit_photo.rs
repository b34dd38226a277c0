//! Edits a food photo with a plain-language instruction.
//!
//! Run with: `cargo run --example edit_photo -- <photo.jpeg> "add a little steam"`
//!
//! Requires `GEMINI_API_KEY` environment variable.

use platecam::{EncodedImage, GeminiBackend, ImageEditor, Settings};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(instruction)) = (args.next(), args.next()) else {
        eprintln!("Usage: edit_photo <photo> <instruction>");
        std::process::exit(2);
    };

    let photo = EncodedImage::load(&input)?;

    let settings = Settings::from_env();
    let backend = GeminiBackend::from_settings(settings.clone())?;
    let editor = ImageEditor::new(Arc::new(backend)).with_timeout(settings.edit_timeout);

    let edited = editor.edit_image(&photo, &instruction).await?;
    let output = format!("edited.{}", edited.format.extension());
    edited.save(&output)?;
    println!("Edited image saved to {output} ({} bytes)", edited.size());

    Ok(())
}
