use avatarkit_types::{HintField, ProviderKind};
use avatarkit_util::substitute_placeholders;
use serde_json::Value;
use tracing::debug;

use super::{Candidate, IdentityProvider, LookupRequest, ProviderSettings};

const PROFILE_PATTERN: &str = "<protocol>//picasaweb.google.com/data/entry/api/user/<id>?alt=json";

/// Size token embedded in the thumbnail URL returned by the profile endpoint.
const THUMBNAIL_SIZE_TOKEN: &str = "s64";

/// Google profile photos; requires a JSON lookup to find the thumbnail URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleProvider;

impl IdentityProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn required_hint(&self) -> HintField {
        HintField::GoogleId
    }

    fn is_synchronous(&self) -> bool {
        false
    }

    fn build_candidate(&self, token: &str, _size_px: u32, settings: &ProviderSettings) -> Candidate {
        Candidate::Lookup(LookupRequest {
            url: substitute_placeholders(PROFILE_PATTERN, &[("protocol", settings.scheme.protocol()), ("id", token)]),
        })
    }

    /// Reads `entry.gphoto$thumbnail.$t` and rewrites its `s64` size token.
    fn extract_candidate(&self, body: &Value, size_px: u32) -> Option<String> {
        let Some(thumbnail) = body.pointer("/entry/gphoto$thumbnail/$t").and_then(Value::as_str) else {
            debug!("profile response has no thumbnail");
            return None;
        };
        Some(thumbnail.replacen(THUMBNAIL_SIZE_TOKEN, &format!("s{size_px}"), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_profile_json() {
        let candidate = GoogleProvider.build_candidate("118", 64, &ProviderSettings::default());
        assert_eq!(
            candidate,
            Candidate::Lookup(LookupRequest {
                url: "https://picasaweb.google.com/data/entry/api/user/118?alt=json".into()
            })
        );
        assert!(!GoogleProvider.is_synchronous());
    }

    #[test]
    fn rewrites_thumbnail_size() {
        let body = json!({
            "entry": { "gphoto$thumbnail": { "$t": "https://lh3.example.com/photo/s64-c/me.jpg" } }
        });
        assert_eq!(
            GoogleProvider.extract_candidate(&body, 120),
            Some("https://lh3.example.com/photo/s120-c/me.jpg".into())
        );
    }

    #[test]
    fn missing_thumbnail_declines() {
        assert_eq!(GoogleProvider.extract_candidate(&json!({ "entry": {} }), 32), None);
        assert_eq!(GoogleProvider.extract_candidate(&json!([]), 32), None);
    }
}
