//! Projection of attempt state into a renderable visual.

use avatarkit_types::{IdentityHints, ResolvedVisual};
use serde::Serialize;

use crate::resolution::AttemptState;

/// Border radius applied when a round mask is requested.
const ROUND_RADIUS_PX: u32 = 500;

/// Build the visual for the current state.
///
/// `background` is used for initials unless the hints name a color.
pub fn project_visual(state: &AttemptState, hints: &IdentityHints, background: &str) -> ResolvedVisual {
    let size_px = hints.target_size_px;
    let round = hints.prefer_round_mask;

    match state.resolved_url() {
        Some(url) => ResolvedVisual::Image {
            url: url.to_string(),
            size_px,
            round,
        },
        None => ResolvedVisual::Initials {
            text: state.fallback_text().unwrap_or_default().to_string(),
            size_px,
            background_color: hints
                .background_color
                .clone()
                .filter(|color| !color.is_empty())
                .unwrap_or_else(|| background.to_string()),
            foreground_color: hints.foreground_color.clone(),
            round,
        },
    }
}

/// Presentational numbers for a host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisualStyle {
    pub width_px: u32,
    pub height_px: u32,
    pub border_radius_px: u32,
    /// Initials only: a third of the size.
    pub font_size_px: Option<u32>,
    /// Initials only: the size plus a tenth, which centers the text.
    pub line_height_px: Option<u32>,
    /// Empty initials are drawn fully transparent.
    pub transparent: bool,
}

impl VisualStyle {
    pub fn for_visual(visual: &ResolvedVisual) -> Self {
        let size_px = visual.size_px();
        let border_radius_px = if visual.is_round() { ROUND_RADIUS_PX } else { 0 };
        let (font_size_px, line_height_px) = match visual {
            ResolvedVisual::Image { .. } => (None, None),
            ResolvedVisual::Initials { .. } => (Some(size_px / 3), Some(size_px.saturating_add(size_px / 10))),
        };

        Self {
            width_px: size_px,
            height_px: size_px,
            border_radius_px,
            font_size_px,
            line_height_px,
            transparent: visual.is_transparent(),
        }
    }
}
