//! Placeholder substitution for provider URL patterns.
//!
//! Patterns use `<name>` placeholders, e.g. `graph.facebook.com/<id>/picture?width=<size>`.
//! Substitution is purely textual: values are inserted as-is and callers are
//! responsible for passing URL-safe text.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([A-Za-z_][A-Za-z0-9_]*)>").expect("valid placeholder regex"));

/// Replace every `<name>` placeholder whose name appears in `substitutions`.
///
/// Placeholders without a substitution are left in place.
///
/// # Example
/// ```rust
/// use avatarkit_util::template::substitute_placeholders;
///
/// let url = substitute_placeholders("<x>/<y>/<x>", &[("x", "a")]);
/// assert_eq!(url, "a/<y>/a");
/// ```
pub fn substitute_placeholders<K, V>(template: &str, substitutions: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: Display,
{
    let mut output = template.to_string();
    for (name, value) in substitutions {
        let needle = format!("<{}>", name.as_ref());
        if output.contains(&needle) {
            output = output.replace(&needle, &value.to_string());
        }
    }
    output
}

/// Names of the placeholders that remain in `template`, in order of appearance.
pub fn placeholder_names(template: &str) -> Vec<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|captures| captures.get(1).map(|name| name.as_str().to_string()))
        .collect()
}
