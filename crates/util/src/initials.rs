/// Convert a display name into badge initials.
///
/// Words are separated by single spaces; the first character of each word is
/// upper-cased and the results are concatenated without separators. Empty
/// words (from repeated spaces) contribute nothing.
///
/// # Example
/// ```rust
/// use avatarkit_util::initials;
///
/// assert_eq!(initials("ada lovelace"), "AL");
/// assert_eq!(initials(""), "");
/// ```
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::initials;

    #[test]
    fn takes_first_letter_of_each_word() {
        assert_eq!(initials("ada lovelace"), "AL");
        assert_eq!(initials("Grace Brewster Murray Hopper"), "GBMH");
    }

    #[test]
    fn empty_name_yields_empty_initials() {
        assert_eq!(initials(""), "");
        assert_eq!(initials("   "), "");
    }

    #[test]
    fn repeated_calls_agree() {
        let name = "émile zola";
        assert_eq!(initials(name), initials(name));
        assert_eq!(initials(name), "ÉZ");
    }

    #[test]
    fn non_letter_first_characters_are_kept() {
        assert_eq!(initials("3m team"), "3T");
        assert_eq!(initials("  leading"), "L");
    }
}
