//! Decoding of lookup response bodies.

use serde_json::Value;
use thiserror::Error;

/// Characters of a rejected body kept for diagnostics.
const PREVIEW_CHARS: usize = 120;

/// A lookup endpoint answered 200 with something that is not JSON.
#[derive(Debug, Error)]
#[error("lookup {url} returned a non-JSON body ({source}); starts with: {preview}")]
pub struct LookupDecodeError {
    url: String,
    #[source]
    source: serde_json::Error,
    preview: String,
}

impl LookupDecodeError {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whitespace-collapsed head of the body, `<empty>` for blank bodies.
    pub fn preview(&self) -> &str {
        &self.preview
    }
}

/// Parse the body fetched from `url`.
pub fn decode_lookup_body(url: &str, body: &str) -> Result<Value, LookupDecodeError> {
    serde_json::from_str(body).map_err(|source| LookupDecodeError {
        url: url.to_string(),
        source,
        preview: body_preview(body),
    })
}

fn body_preview(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty>".to_string();
    }
    match collapsed.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}
