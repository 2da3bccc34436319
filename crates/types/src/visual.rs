//! Terminal output of avatar resolution.

use serde::{Deserialize, Serialize};

/// Renderable result of resolving an avatar.
///
/// A visual is either an image URL or a text badge. The renderer reports
/// image-load failures back to the engine, which may replace an `Image`
/// with the next candidate or fall through to `Initials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedVisual {
    Image {
        url: String,
        size_px: u32,
        round: bool,
    },
    Initials {
        /// Badge text; empty renders as a fully transparent placeholder.
        text: String,
        size_px: u32,
        background_color: String,
        foreground_color: String,
        round: bool,
    },
}

impl ResolvedVisual {
    pub fn size_px(&self) -> u32 {
        match self {
            Self::Image { size_px, .. } | Self::Initials { size_px, .. } => *size_px,
        }
    }

    pub fn is_round(&self) -> bool {
        match self {
            Self::Image { round, .. } | Self::Initials { round, .. } => *round,
        }
    }

    /// Image URL when the visual is an image.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Image { url, .. } => Some(url),
            Self::Initials { .. } => None,
        }
    }

    /// Badge text when the visual is an initials badge.
    pub fn initials_text(&self) -> Option<&str> {
        match self {
            Self::Image { .. } => None,
            Self::Initials { text, .. } => Some(text),
        }
    }

    /// `true` for an initials badge with no text.
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Initials { text, .. } if text.is_empty())
    }
}
