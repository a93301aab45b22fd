//! Site rules as stored in extension storage.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pattern::Pattern;
use crate::style::StyleMap;

fn default_enabled() -> bool {
    true
}

/// A URL pattern with its own enable flag and optional style override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Site {
    /// Normalized pattern, `*` is a wildcard
    pub url: String,
    /// Styling applies when this site is the best match
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Use `styles` instead of the global styles
    #[serde(default)]
    pub use_own_styles: bool,
    #[serde(default)]
    pub styles: StyleMap,
}

impl Site {
    /// A new enabled rule using the global styles.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            enabled: true,
            use_own_styles: false,
            styles: StyleMap::new(),
        }
    }

    /// The rule's URL as a compiled pattern.
    pub fn pattern(&self) -> Pattern<'_> {
        Pattern::new(&self.url)
    }

    /// Test a (normalized) URL against this rule.
    pub fn matches_url(&self, url: &str) -> bool {
        self.pattern().matches(url)
    }

    /// True if this rule's pattern covers some disabled rule in `sites`.
    pub fn covers_disabled_site(&self, sites: &[Site]) -> bool {
        let pattern = self.pattern();
        sites
            .iter()
            .any(|site| !site.enabled && site.url != self.url && pattern.matches(&site.url))
    }
}
