//! Photographic style presets and their prompt wording.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A photographic style preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoStyle {
    /// Dark, moody, textured.
    RusticDark,
    /// High-key, minimalist, airy.
    #[default]
    BrightModern,
    /// Top-down flat lay for social feeds.
    SocialMedia,
}

/// Prompt suffix per style.
const STYLE_SUFFIXES: &[(PhotoStyle, &str)] = &[
    (
        PhotoStyle::RusticDark,
        "Dark, rustic, moody lighting, shot on a dark wood or slate surface with vintage elements. \
         Focus on texture and shadows. Chiaroscuro effect.",
    ),
    (
        PhotoStyle::BrightModern,
        "Bright, modern, clean aesthetic, minimalist plating on a white or light-colored plate. \
         Soft, natural window light. High-key, airy, and crisp.",
    ),
    (
        PhotoStyle::SocialMedia,
        "Vibrant top-down flat lay shot, perfect for social media. Colorful, well-composed on a \
         stylish surface like marble with complementary props.",
    ),
];

impl PhotoStyle {
    /// Every style, in display order.
    pub const ALL: [PhotoStyle; 3] = [Self::RusticDark, Self::BrightModern, Self::SocialMedia];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RusticDark => "Rustic/Dark",
            Self::BrightModern => "Bright/Modern",
            Self::SocialMedia => "Social Media",
        }
    }

    /// Machine-friendly name (`rustic-dark`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RusticDark => "rustic-dark",
            Self::BrightModern => "bright-modern",
            Self::SocialMedia => "social-media",
        }
    }

    /// Style-specific prompt suffix; empty if the style has no table entry.
    pub fn prompt_suffix(&self) -> &'static str {
        STYLE_SUFFIXES
            .iter()
            .find(|(style, _)| style == self)
            .map(|(_, suffix)| *suffix)
            .unwrap_or("")
    }
}

impl std::fmt::Display for PhotoStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PhotoStyle {
    type Err = String;

    /// Accepts the machine name or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| {
                style.as_str().eq_ignore_ascii_case(needle)
                    || style.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("unknown photo style '{needle}'"))
    }
}

/// Prompt suffix for a style given by name. Unknown names yield an empty suffix.
pub fn prompt_suffix_for(name: &str) -> &'static str {
    name.parse::<PhotoStyle>()
        .map(|style| style.prompt_suffix())
        .unwrap_or("")
}
