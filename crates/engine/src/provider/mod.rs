//! Identity providers and the fixed provider chain.
//!
//! Modules:
//! - `facebook`, `google`, `skype`: social identifier providers
//! - `gravatar`, `clearbit`: email keyed providers
//! - `chain`: the ordered, process-wide provider list

mod chain;
mod clearbit;
mod facebook;
mod google;
mod gravatar;
mod skype;

use std::fmt::Debug;

use avatarkit_types::{HintField, ProviderKind, Scheme};
use avatarkit_util::ResolverSettings;
use serde_json::Value;

pub use chain::{ChainEntry, ProviderChain};
pub use clearbit::ClearbitProvider;
pub use facebook::FacebookProvider;
pub use google::GoogleProvider;
pub use gravatar::{GravatarProvider, gravatar_hash};
pub use skype::SkypeProvider;

/// Settings that shape provider URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderSettings {
    pub scheme: Scheme,
    /// Display is high-density (retina); Gravatar sizes are doubled.
    pub high_density: bool,
}

impl From<&ResolverSettings> for ProviderSettings {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            scheme: settings.scheme,
            high_density: settings.high_density,
        }
    }
}

/// Network request a lookup provider needs before it can name an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// JSON endpoint to GET.
    pub url: String,
}

/// What a provider produced for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Displayable image URL, available immediately.
    Url(String),
    /// A fetch is required; the response goes through
    /// [`IdentityProvider::extract_candidate`].
    Lookup(LookupRequest),
    /// The token cannot produce a URL (e.g. an email without a domain).
    Declined,
}

/// A single identity service able to turn a hint into an image URL.
pub trait IdentityProvider: Send + Sync + Debug {
    fn kind(&self) -> ProviderKind;

    /// Hint field that must be present for this provider to run.
    fn required_hint(&self) -> HintField;

    /// `true` when [`build_candidate`](Self::build_candidate) never asks for a lookup.
    fn is_synchronous(&self) -> bool {
        true
    }

    fn build_candidate(&self, token: &str, size_px: u32, settings: &ProviderSettings) -> Candidate;

    /// Pull an image URL out of a lookup response.
    fn extract_candidate(&self, _body: &Value, _size_px: u32) -> Option<String> {
        None
    }
}
