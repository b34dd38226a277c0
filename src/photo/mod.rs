//! Photo styles, prompt construction, generation and editing.

mod editor;
mod generator;
mod style;

pub use editor::ImageEditor;
pub use generator::{build_prompt, ImageGenerator};
pub use style::{prompt_suffix_for, PhotoStyle};
