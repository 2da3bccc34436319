//! Leaf helpers shared by the avatarkit engine and CLI.
//!
//! - `template`: `<name>` placeholder substitution for provider URL patterns
//! - `initials`: display-name to badge-text conversion
//! - `palette`: pluggable background color selection
//! - `settings`: JSON + environment backed resolver settings

pub mod initials;
pub mod palette;
pub mod settings;
pub mod template;

pub use initials::initials;
pub use palette::{ColorSelector, DEFAULT_PALETTE, FixedColorSelector, RandomColorSelector, SeededColorSelector};
pub use settings::{ResolverSettings, SettingsError};
pub use template::{placeholder_names, substitute_placeholders};
