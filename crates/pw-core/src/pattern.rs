//! Wildcard pattern matching
//!
//! A pattern is literal text with `*` standing for any run of characters.
//! Matching is unanchored on the left and anchored on the right, so
//! `example.com/docs` matches `https://example.com/docs` but not
//! `https://example.com/docs/intro`.

// =============================================================================
// Pattern
// =============================================================================

/// A pattern split into its literal segments.
///
/// `a*b*c` is stored as `["a", "b", "c"]`. Matching walks the segments like
/// FIND_LIT / SKIP_ANY / ASSERT_END: every segment but the last is found
/// leftmost-first after the previous one, the last must end the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern<'a> {
    segments: Vec<&'a str>,
}

impl<'a> Pattern<'a> {
    /// Split a pattern on `*`.
    pub fn new(pattern: &'a str) -> Self {
        Self {
            segments: pattern.split('*').collect(),
        }
    }

    /// Number of wildcards in the pattern.
    pub fn wildcard_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Test a URL against the pattern. Case-sensitive.
    pub fn matches(&self, url: &str) -> bool {
        let (last, leading) = match self.segments.split_last() {
            Some(split) => split,
            None => return false,
        };

        // Degenerate empty pattern
        if leading.is_empty() && last.is_empty() {
            return false;
        }

        if !url.ends_with(last) {
            return false;
        }

        // Leading segments must fit before the anchored tail
        let limit = url.len() - last.len();
        let mut pos = 0;
        for segment in leading {
            if segment.is_empty() {
                continue;
            }
            match url[pos..limit].find(segment) {
                Some(found) => pos += found + segment.len(),
                None => return false,
            }
        }

        true
    }
}

/// Test a URL against a pattern string.
#[inline]
pub fn matches(pattern: &str, url: &str) -> bool {
    Pattern::new(pattern).matches(url)
}
