//! Style values and style resolution

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidValueError;
use crate::site::Site;

/// CSS property name (DOM camelCase) to CSS length value.
pub type StyleMap = BTreeMap<String, String>;

/// Properties the extension manages on the page body.
pub const SUPPORTED_PROPERTIES: &[&str] = &["maxWidth", "marginLeft"];

/// Global styles written at install time.
pub fn default_global_styles() -> StyleMap {
    let mut styles = StyleMap::new();
    styles.insert("maxWidth".to_string(), "1000px".to_string());
    styles.insert("marginLeft".to_string(), "200px".to_string());
    styles
}

/// Convert a DOM property name to its CSS name (`maxWidth` -> `max-width`).
pub fn css_property_name(property: &str) -> String {
    let mut name = String::with_capacity(property.len() + 2);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            name.push('-');
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

// =============================================================================
// Value Parsing
// =============================================================================

/// Length unit accepted in style values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Px,
    Percent,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Percent => "%",
        }
    }
}

impl FromStr for Unit {
    type Err = InvalidValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "px" => Ok(Self::Px),
            "%" => Ok(Self::Percent),
            _ => Err(InvalidValueError::InvalidUnit),
        }
    }
}

/// A parsed `<number><unit>` length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleValue {
    pub number: f64,
    pub unit: Unit,
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.unit.as_str())
    }
}

/// Length of the `-?\d*\.?\d*` prefix.
fn number_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// Parse a CSS length such as `"100px"` or `"33.3%"`. Whitespace is ignored.
pub fn parse_style(value: &str) -> Result<StyleValue, InvalidValueError> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let (number, unit) = compact.split_at(number_prefix_len(&compact));

    if number.is_empty() {
        return Err(InvalidValueError::MissingNumber);
    }

    let parsed: f64 = number.parse().map_err(|_| InvalidValueError::InvalidNumber)?;
    if number.starts_with('-') {
        return Err(InvalidValueError::Negative);
    }

    if unit.is_empty() {
        return Err(InvalidValueError::MissingUnit);
    }

    let unit: Unit = unit.parse()?;

    Ok(StyleValue { number: parsed, unit })
}

/// Parse every value of a style map.
pub fn validate_styles(styles: &StyleMap) -> Result<BTreeMap<String, StyleValue>, InvalidValueError> {
    styles
        .iter()
        .map(|(prop, value)| parse_style(value).map(|parsed| (prop.clone(), parsed)))
        .collect()
}

// =============================================================================
// Resolution
// =============================================================================

/// Whether styling applies for a best match (or none) under the inverse flag.
pub fn is_effectively_enabled(matched: Option<&Site>, inverse: bool) -> bool {
    let base = matched.map_or(false, |site| site.enabled);
    base != inverse
}

/// Pick the styles to apply, or `None` when the page must be cleared.
pub fn resolve<'a>(matched: Option<&'a Site>, global: &'a StyleMap, inverse: bool) -> Option<&'a StyleMap> {
    if !is_effectively_enabled(matched, inverse) {
        return None;
    }

    match matched {
        Some(site) if site.use_own_styles => Some(&site.styles),
        _ => Some(global),
    }
}
