//! Background color selection for initials badges.
//!
//! Selection sits behind [`ColorSelector`] so hosts can pick randomly while
//! tests use a seeded or fixed selector and assert exact colors.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Colors used when a badge has no explicit background.
pub const DEFAULT_PALETTE: &[&str] = &["#d73d32", "#7e3794", "#4285f4", "#67ae3f", "#d61a7f", "#ff4080"];

/// Chooses a background color for an initials badge.
pub trait ColorSelector: Send {
    fn select(&mut self) -> String;
}

fn palette_or_default(palette: Vec<String>) -> Vec<String> {
    if palette.is_empty() {
        DEFAULT_PALETTE.iter().map(|color| color.to_string()).collect()
    } else {
        palette
    }
}

/// Picks a palette entry with the thread-local RNG.
#[derive(Debug, Clone)]
pub struct RandomColorSelector {
    palette: Vec<String>,
}

impl RandomColorSelector {
    /// An empty palette falls back to [`DEFAULT_PALETTE`].
    pub fn new(palette: Vec<String>) -> Self {
        Self {
            palette: palette_or_default(palette),
        }
    }
}

impl Default for RandomColorSelector {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ColorSelector for RandomColorSelector {
    fn select(&mut self) -> String {
        let mut rng = rand::thread_rng();
        self.palette.choose(&mut rng).cloned().unwrap_or_else(|| DEFAULT_PALETTE[0].to_string())
    }
}

/// Deterministic selector driven by a seeded RNG.
///
/// Two selectors built with the same seed and palette yield the same sequence.
#[derive(Debug, Clone)]
pub struct SeededColorSelector {
    palette: Vec<String>,
    rng: StdRng,
}

impl SeededColorSelector {
    pub fn new(seed: u64, palette: Vec<String>) -> Self {
        Self {
            palette: palette_or_default(palette),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ColorSelector for SeededColorSelector {
    fn select(&mut self) -> String {
        self.palette.choose(&mut self.rng).cloned().unwrap_or_else(|| DEFAULT_PALETTE[0].to_string())
    }
}

/// Always returns the same color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedColorSelector(pub String);

impl ColorSelector for FixedColorSelector {
    fn select(&mut self) -> String {
        self.0.clone()
    }
}
