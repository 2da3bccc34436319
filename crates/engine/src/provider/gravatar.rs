use avatarkit_types::{HintField, ProviderKind};
use avatarkit_util::substitute_placeholders;
use md5::{Digest, Md5};

use super::{Candidate, IdentityProvider, ProviderSettings};

/// `d=404` makes a missing avatar surface as an image-load failure.
const AVATAR_PATTERN: &str = "<prefix>gravatar.com/avatar/<id>?s=<size>&d=404";

/// Gravatar images keyed by email address or an existing MD5 hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct GravatarProvider;

/// Lower-hex MD5 of a normalized (trimmed, lower-cased) email address.
pub fn gravatar_hash(email: &str) -> String {
    hex::encode(Md5::digest(email.trim().to_lowercase().as_bytes()))
}

impl IdentityProvider for GravatarProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gravatar
    }

    fn required_hint(&self) -> HintField {
        HintField::Email
    }

    fn build_candidate(&self, token: &str, size_px: u32, settings: &ProviderSettings) -> Candidate {
        // Tokens without '@' are already hashed.
        let id = if token.contains('@') { gravatar_hash(token) } else { token.to_string() };
        let prefix = if settings.scheme.is_secure() { "https://secure." } else { "http://" };
        let size = if settings.high_density { size_px.saturating_mul(2) } else { size_px };

        Candidate::Url(substitute_placeholders(
            AVATAR_PATTERN,
            &[("prefix", prefix.to_string()), ("id", id), ("size", size.to_string())],
        ))
    }
}
