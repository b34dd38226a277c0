#![warn(missing_docs)]
//! Platecam - AI food photography from restaurant menu text.
//!
//! Paste a menu, pick a photographic style, and get one generated photo per
//! dish. Any photo can then be edited with a plain-language instruction.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use platecam::{GeminiBackend, PhotoStyle, Settings, Studio};
//!
//! #[tokio::main]
//! async fn main() -> platecam::Result<()> {
//!     let settings = Settings::from_env();
//!     let backend = GeminiBackend::from_settings(settings.clone())
//!         .map_err(|e| platecam::PlatecamError::Configuration(e.to_string()))?;
//!     let mut studio = Studio::from_settings(Arc::new(backend), &settings);
//!
//!     let menu = "MAINS\nMargherita Pizza - $15\nSan Marzano tomatoes, mozzarella, basil.";
//!     studio.request_generation(menu, PhotoStyle::RusticDark).await?;
//!
//!     let id = studio.state().images()[0].id.clone();
//!     let edited = studio.request_edit(&id, "add a little steam").await?;
//!     edited.image.save(edited.suggested_file_name())?;
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`menu`]: menu text to [`Dish`] list via structured extraction
//! - [`photo`]: styles, prompt construction, [`ImageGenerator`], [`ImageEditor`]
//! - [`orchestrator`]: parse, then generate every dish concurrently (all-or-nothing)
//! - [`session`]: [`SessionState`] transitions and the [`Studio`] intent dispatcher
//! - [`backend`]: the [`GenerativeBackend`] seam and its Gemini implementation
//!
//! # Features
//!
//! - `cli` (default): the `platecam` command-line tool

pub mod backend;
pub mod config;
mod error;
pub mod image;
pub mod menu;
pub mod orchestrator;
pub mod photo;
pub mod session;

// Re-export error types at crate root
pub use error::{BackendError, PlatecamError, Result};

pub use backend::{ContentPart, GeminiBackend, GeminiBackendBuilder, GenerativeBackend, ImageOptions};
pub use config::Settings;
pub use image::{AspectRatio, EncodedImage, GeneratedImage, ImageFormat};
pub use menu::{Dish, MenuParser};
pub use orchestrator::{GenerationOrchestrator, Progress};
pub use photo::{ImageEditor, ImageGenerator, PhotoStyle};
pub use session::{Phase, SessionEvent, SessionState, Studio, EXAMPLE_MENU};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{GeminiBackend, GenerativeBackend};
    pub use crate::config::Settings;
    pub use crate::error::{PlatecamError, Result};
    pub use crate::image::{EncodedImage, GeneratedImage};
    pub use crate::menu::Dish;
    pub use crate::photo::PhotoStyle;
    pub use crate::session::{SessionState, Studio};
}
