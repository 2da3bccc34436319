use avatarkit_types::{HintField, ProviderKind};
use avatarkit_util::substitute_placeholders;

use super::{Candidate, IdentityProvider, ProviderSettings};

const LOGO_PATTERN: &str = "<prefix>logo.clearbit.com/<domain>";

/// Company logos keyed by the domain of an email address. Logos have no size parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearbitProvider;

impl IdentityProvider for ClearbitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Clearbit
    }

    fn required_hint(&self) -> HintField {
        HintField::Email
    }

    fn build_candidate(&self, token: &str, _size_px: u32, settings: &ProviderSettings) -> Candidate {
        let domain = match token.split_once('@') {
            Some((_, domain)) if !domain.is_empty() => domain,
            _ => return Candidate::Declined,
        };
        let prefix = if settings.scheme.is_secure() { "https://secure." } else { "http://" };
        Candidate::Url(substitute_placeholders(LOGO_PATTERN, &[("prefix", prefix), ("domain", domain)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatarkit_types::Scheme;

    #[test]
    fn uses_domain_after_at_sign() {
        let candidate = ClearbitProvider.build_candidate("ada@analytical.engine", 32, &ProviderSettings::default());
        assert_eq!(candidate, Candidate::Url("https://secure.logo.clearbit.com/analytical.engine".into()));
    }

    #[test]
    fn http_scheme_uses_plain_host() {
        let settings = ProviderSettings {
            scheme: Scheme::Http,
            high_density: false,
        };
        let candidate = ClearbitProvider.build_candidate("ada@example.org", 32, &settings);
        assert_eq!(candidate, Candidate::Url("http://logo.clearbit.com/example.org".into()));
    }

    #[test]
    fn hashed_or_malformed_email_declines() {
        assert_eq!(ClearbitProvider.build_candidate("0bc83cb571cd1c50", 32, &ProviderSettings::default()), Candidate::Declined);
        assert_eq!(ClearbitProvider.build_candidate("ada@", 32, &ProviderSettings::default()), Candidate::Declined);
    }
}
