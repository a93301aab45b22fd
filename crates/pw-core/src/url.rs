//! URL cleaning and validation
//!
//! Every URL goes through [`normalize`] before it is stored as a pattern or
//! matched against one, so patterns and match subjects share the same rules.

use crate::error::ValidationError;

/// Scheme prefixes of browser-internal pages. Content scripts never run there.
const DISALLOWED_PREFIXES: &[&str] = &["chrome://", "brave://", "about:"];

/// Longest URL echoed back verbatim in an error message.
const MAX_ERROR_URL_LEN: usize = 30;

// =============================================================================
// Normalization
// =============================================================================

/// Clean and validate a raw URL.
pub fn normalize(raw: &str) -> Result<String, ValidationError> {
    let url = clean_url(raw);
    check_url(&url)?;
    Ok(url)
}

/// Remove whitespace, query, fragment and a single trailing slash.
///
/// The query is cut at the last `?`, then the fragment at the last `#`.
pub fn clean_url(raw: &str) -> String {
    let mut url: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    for marker in ['?', '#'] {
        if let Some(pos) = url.rfind(marker) {
            url.truncate(pos);
        }
    }

    if url.ends_with('/') {
        url.pop();
    }

    url
}

/// Validate an already-cleaned URL.
pub fn check_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    let bytes = url.as_bytes();
    let disallowed = DISALLOWED_PREFIXES
        .iter()
        .any(|prefix| bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()));

    if disallowed {
        return Err(ValidationError::Incompatible(ellipsize(url)));
    }

    Ok(())
}

/// True when [`check_url`] accepts the URL.
pub fn is_valid_url(url: &str) -> bool {
    check_url(url).is_ok()
}

fn ellipsize(url: &str) -> String {
    match url.char_indices().nth(MAX_ERROR_URL_LEN) {
        Some((cut, _)) => format!("{}...", &url[..cut]),
        None => url.to_string(),
    }
}

// =============================================================================
// Scheme Handling
// =============================================================================

/// Get the position after "://", if the URL has one.
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    url.find("://").map(|pos| pos + 3)
}

/// Split a URL into its `proto://` prefix (possibly empty) and the rest.
#[inline]
pub fn split_scheme(url: &str) -> (&str, &str) {
    match get_scheme_end(url) {
        Some(end) => url.split_at(end),
        None => ("", url),
    }
}

// =============================================================================
// Sibling Patterns
// =============================================================================

/// Broaden a cleaned URL into a pattern covering its whole directory.
///
/// `https://en.wikipedia.org/wiki/Main_Page` becomes
/// `https://en.wikipedia.org/wiki/*`. Without any `/` after the scheme the
/// remainder is dropped entirely, leaving `scheme*`.
pub fn derive_sibling_pattern(url: &str) -> String {
    if url.ends_with('/') {
        return format!("{url}*");
    }

    let (scheme, rest) = split_scheme(url);
    let dir = match rest.rfind('/') {
        Some(slash) => &rest[..=slash],
        None => "",
    };

    format!("{scheme}{dir}*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_query_fragment_and_slash() {
        assert_eq!(normalize("  https://a.com/?x=1#frag  ").unwrap(), "https://a.com");
        assert_eq!(normalize("https://a.com/path/").unwrap(), "https://a.com/path");
        assert_eq!(normalize("https://a.com/p?q=1").unwrap(), "https://a.com/p");
        assert_eq!(normalize("https://a.com/p#top").unwrap(), "https://a.com/p");
        assert_eq!(normalize("https://a. com/ p").unwrap(), "https://a.com/p");
    }

    #[test]
    fn test_normalize_strips_only_one_trailing_slash() {
        assert_eq!(normalize("https://a.com//").unwrap(), "https://a.com/");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(normalize(""), Err(ValidationError::MissingUrl));
        assert_eq!(normalize("   \t\n"), Err(ValidationError::MissingUrl));
        assert_eq!(normalize("/"), Err(ValidationError::MissingUrl));
        assert_eq!(normalize("?x=1"), Err(ValidationError::MissingUrl));
    }

    #[test]
    fn test_normalize_rejects_internal_pages() {
        assert!(matches!(normalize("chrome://newtab"), Err(ValidationError::Incompatible(_))));
        assert!(matches!(normalize("brave://settings"), Err(ValidationError::Incompatible(_))));
        assert!(matches!(normalize("about:blank"), Err(ValidationError::Incompatible(_))));
        assert!(matches!(normalize("  CHROME://extensions"), Err(ValidationError::Incompatible(_))));
    }

    #[test]
    fn test_incompatible_message_is_ellipsized() {
        let err = check_url("chrome://settings/content/siteDetails?site=x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "URL \"chrome://settings/content/site...\" is incompatible with this extension"
        );
        let err = check_url("about:blank").unwrap_err();
        assert_eq!(err.to_string(), "URL \"about:blank\" is incompatible with this extension");
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("example.com"));
        assert!(is_valid_url("*.example.com/*"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("about:config"));
    }

    #[test]
    fn test_split_scheme() {
        assert_eq!(split_scheme("https://a.com/x"), ("https://", "a.com/x"));
        assert_eq!(split_scheme("a.com/x"), ("", "a.com/x"));
        assert_eq!(get_scheme_end("http://a.com"), Some(7));
    }

    #[test]
    fn test_derive_sibling_pattern() {
        assert_eq!(
            derive_sibling_pattern("https://en.wikipedia.org/wiki/Main_Page"),
            "https://en.wikipedia.org/wiki/*"
        );
        assert_eq!(derive_sibling_pattern("example.com/a/b"), "example.com/a/*");
        assert_eq!(
            derive_sibling_pattern("https://*.wikipedia.org/wiki/Main_Page"),
            "https://*.wikipedia.org/wiki/*"
        );
        assert_eq!(derive_sibling_pattern("*.google.com/"), "*.google.com/*");
    }

    #[test]
    fn test_derive_sibling_pattern_without_path() {
        assert_eq!(derive_sibling_pattern("en.wikipedia.org"), "*");
        assert_eq!(derive_sibling_pattern("https://example.com"), "https://*");
    }
}
