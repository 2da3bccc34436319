use avatarkit_types::{HintField, ProviderKind};
use avatarkit_util::substitute_placeholders;

use super::{Candidate, IdentityProvider, ProviderSettings};

const AVATAR_PATTERN: &str = "<protocol>//api.skype.com/users/<id>/profile/avatar";

/// Skype avatars are served at a fixed size, so the requested size is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkypeProvider;

impl IdentityProvider for SkypeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Skype
    }

    fn required_hint(&self) -> HintField {
        HintField::SkypeId
    }

    fn build_candidate(&self, token: &str, _size_px: u32, settings: &ProviderSettings) -> Candidate {
        Candidate::Url(substitute_placeholders(
            AVATAR_PATTERN,
            &[("protocol", settings.scheme.protocol()), ("id", token)],
        ))
    }
}
