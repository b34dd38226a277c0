//! Encoded image values and gallery entries.

mod types;

pub use types::{new_image_id, AspectRatio, EncodedImage, GeneratedImage, ImageFormat};
