//! Core types for encoded images and gallery entries.

use crate::error::{BackendError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Parses a MIME type such as `image/jpeg`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratios sent to the image model.
///
/// Menu photos are always framed 4:3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 4:3 landscape.
    #[default]
    #[serde(rename = "4:3")]
    Standard,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "4:3").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "4:3",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A self-describing encoded image: format plus raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Image format (determines the MIME type).
    pub format: ImageFormat,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("format", &self.format)
            .field("size", &self.data.len())
            .finish()
    }
}

impl EncodedImage {
    /// Creates a new encoded image.
    pub fn new(format: ImageFormat, data: Vec<u8>) -> Self {
        Self { format, data }
    }

    /// Returns the MIME type of the image.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }

    /// Decodes a base64 payload tagged with a MIME type.
    ///
    /// Unknown MIME types fall back to magic-byte detection, then PNG.
    pub fn from_base64(mime_type: &str, b64: &str) -> std::result::Result<Self, BackendError> {
        let data = decode_base64_lenient(b64).map_err(|e| BackendError::Decode(e.to_string()))?;
        let format = ImageFormat::from_mime_type(mime_type)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();
        Ok(Self::new(format, data))
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    ///
    /// A header without a MIME type is treated as PNG.
    pub fn from_data_url(url: &str) -> std::result::Result<Self, BackendError> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| BackendError::Decode("data URL has no ',' separator".into()))?;
        let mime = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|m| !m.is_empty())
            .unwrap_or("image/png");
        Self::from_base64(mime, payload)
    }

    /// Reads an image file, detecting its format from content, then extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .unwrap_or_default();
        Ok(Self::new(format, data))
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

/// Decodes base64 that may carry whitespace or lack padding.
fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(cleaned.trim_end_matches('='))
}

static NEXT_IMAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builds a gallery id from the dish name, the wall clock and a process-wide counter.
///
/// The counter keeps ids unique even when several images finish in the same millisecond.
pub fn new_image_id(dish_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = NEXT_IMAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{millis}-{seq}", slugify(dish_name))
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "dish".to_string()
    } else {
        slug.to_string()
    }
}

/// A photo in the session gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Unique id within the session.
    pub id: String,
    /// Name of the dish this photo depicts.
    pub dish_name: String,
    /// Current image payload; replaced in place by edits.
    pub image: EncodedImage,
}

impl GeneratedImage {
    /// Creates a gallery entry with a fresh id.
    pub fn new(dish_name: impl Into<String>, image: EncodedImage) -> Self {
        let dish_name = dish_name.into();
        Self {
            id: new_image_id(&dish_name),
            dish_name,
            image,
        }
    }

    /// File name for saving locally: whitespace becomes `_`, extension follows the format.
    pub fn suggested_file_name(&self) -> String {
        let stem = self.dish_name.split_whitespace().collect::<Vec<_>>().join("_");
        let stem = stem.replace(['/', '\\'], "_");
        format!("{}.{}", stem, self.image.format.extension())
    }
}
