use avatarkit_types::{HintField, ProviderKind};
use avatarkit_util::substitute_placeholders;

use super::{Candidate, IdentityProvider, ProviderSettings};

const PICTURE_PATTERN: &str = "<protocol>//graph.facebook.com/<id>/picture?width=<size>";

/// Facebook profile pictures keyed by user id; the size is passed through as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacebookProvider;

impl IdentityProvider for FacebookProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Facebook
    }

    fn required_hint(&self) -> HintField {
        HintField::FacebookId
    }

    fn build_candidate(&self, token: &str, size_px: u32, settings: &ProviderSettings) -> Candidate {
        Candidate::Url(substitute_placeholders(
            PICTURE_PATTERN,
            &[
                ("protocol", settings.scheme.protocol().to_string()),
                ("id", token.to_string()),
                ("size", size_px.to_string()),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatarkit_types::Scheme;

    #[test]
    fn builds_picture_url_with_requested_width() {
        let candidate = FacebookProvider.build_candidate("4", 48, &ProviderSettings::default());
        assert_eq!(candidate, Candidate::Url("https://graph.facebook.com/4/picture?width=48".into()));
    }

    #[test]
    fn follows_configured_scheme() {
        let settings = ProviderSettings {
            scheme: Scheme::Http,
            high_density: true,
        };
        let candidate = FacebookProvider.build_candidate("zuck", 32, &settings);
        assert_eq!(candidate, Candidate::Url("http://graph.facebook.com/zuck/picture?width=32".into()));
    }
}
