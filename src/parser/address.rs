//! Email-address detection in arbitrary text.
//!
//! The pattern is deliberately loose (word characters, dots and hyphens on
//! both sides of the `@`, with at least one dot in the domain) so that
//! addresses buried in display names, signatures or quoted replies are
//! caught. All results are lowercased.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("valid address pattern"));

/// First address in `text`, lowercased.
pub fn extract_first(text: &str) -> Option<String> {
    ADDRESS_REGEX
        .find(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Every non-overlapping address in `text`, lowercased, in scan order.
///
/// Duplicates are kept; callers deduplicate.
pub fn extract_all(text: &str) -> Vec<String> {
    ADDRESS_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// `text` with every address removed outright (no replacement character).
pub fn strip_all(text: &str) -> Cow<'_, str> {
    ADDRESS_REGEX.replace_all(text, "")
}

/// `true` if `text` contains at least one address.
pub fn contains_address(text: &str) -> bool {
    ADDRESS_REGEX.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_from_display_form() {
        assert_eq!(
            extract_first("John Smith <John.Smith@Example.COM>"),
            Some("john.smith@example.com".to_string())
        );
    }

    #[test]
    fn test_extract_first_none() {
        assert_eq!(extract_first("no address here"), None);
        assert_eq!(extract_first("user@localhost"), None);
        assert_eq!(extract_first(""), None);
    }

    #[test]
    fn test_extract_all_keeps_order_and_duplicates() {
        let found = extract_all("a@x.com, B@X.COM; c@y.org a@x.com");
        assert_eq!(found, vec!["a@x.com", "b@x.com", "c@y.org", "a@x.com"]);
    }

    #[test]
    fn test_extract_all_is_pure() {
        let text = "ping first.last@sub.example.co.uk and ops-team@corp.io";
        assert_eq!(extract_all(text), extract_all(text));
    }

    #[test]
    fn test_strip_all_preserves_surroundings() {
        assert_eq!(
            strip_all("Contact John Smith at john@acme.com."),
            "Contact John Smith at ."
        );
        assert_eq!(strip_all("<a@b.com>"), "<>");
        assert_eq!(strip_all("nothing to strip"), "nothing to strip");
    }

    #[test]
    fn test_unicode_local_part() {
        assert_eq!(
            extract_first("écrire à josé@exemple.fr"),
            Some("josé@exemple.fr".to_string())
        );
    }

    #[test]
    fn test_contains_address() {
        assert!(contains_address("mail me: x@y.io"));
        assert!(!contains_address("mail me"));
    }
}
