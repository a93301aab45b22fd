//! Content-script boundary
//!
//! The message sent to a tab, and the state machine the content script runs
//! to turn successive messages into inline-style operations on the body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::style::{css_property_name, StyleMap, SUPPORTED_PROPERTIES};

// =============================================================================
// Message
// =============================================================================

/// `{styles: null}` clears the page, otherwise each listed property is set
/// (or removed when its value is null).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContentMessage {
    pub styles: Option<BTreeMap<String, Option<String>>>,
}

impl ContentMessage {
    /// Message that clears every applied property.
    pub fn clear() -> Self {
        Self { styles: None }
    }

    pub fn is_clear(&self) -> bool {
        self.styles.is_none()
    }
}

/// Build the message for a resolver decision.
///
/// A present decision always lists every supported property, with null for
/// the ones the chosen style map does not define.
pub fn style_message(decision: Option<&StyleMap>) -> ContentMessage {
    let styles = decision.map(|chosen| {
        SUPPORTED_PROPERTIES
            .iter()
            .map(|prop| (prop.to_string(), chosen.get(*prop).cloned()))
            .collect()
    });
    ContentMessage { styles }
}

// =============================================================================
// Tab State Machine
// =============================================================================

/// A single inline-style operation, using CSS property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOp {
    Set { property: String, value: String },
    Remove { property: String },
}

/// What the extension has applied to a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TabStyle {
    #[default]
    Unstyled,
    /// Properties currently set, keyed by DOM name
    Styled(StyleMap),
}

impl TabStyle {
    /// Apply a message: clear what was applied before, then apply the new map.
    ///
    /// Returns the next state and the operations to run on the body.
    pub fn receive(&self, message: &ContentMessage) -> (TabStyle, Vec<StyleOp>) {
        let mut ops = Vec::new();

        if let TabStyle::Styled(applied) = self {
            for prop in applied.keys() {
                ops.push(StyleOp::Remove {
                    property: css_property_name(prop),
                });
            }
        }

        let styles = match &message.styles {
            Some(styles) => styles,
            None => return (TabStyle::Unstyled, ops),
        };

        let mut applied = StyleMap::new();
        for (prop, value) in styles {
            let property = css_property_name(prop);
            match value {
                Some(value) => {
                    ops.push(StyleOp::Set {
                        property,
                        value: value.clone(),
                    });
                    applied.insert(prop.clone(), value.clone());
                }
                None => {
                    let op = StyleOp::Remove { property };
                    if !ops.contains(&op) {
                        ops.push(op);
                    }
                }
            }
        }

        (TabStyle::Styled(applied), ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::default_global_styles;

    fn set(property: &str, value: &str) -> StyleOp {
        StyleOp::Set {
            property: property.into(),
            value: value.into(),
        }
    }

    fn remove(property: &str) -> StyleOp {
        StyleOp::Remove {
            property: property.into(),
        }
    }

    #[test]
    fn test_style_message_lists_supported_properties() {
        let mut own = StyleMap::new();
        own.insert("maxWidth".into(), "50%".into());
        own.insert("color".into(), "red".into());

        let message = style_message(Some(&own));
        let styles = message.styles.unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles["maxWidth"], Some("50%".to_string()));
        assert_eq!(styles["marginLeft"], None);

        assert!(style_message(None).is_clear());
    }

    #[test]
    fn test_message_json() {
        let json = serde_json::to_value(ContentMessage::clear()).unwrap();
        assert_eq!(json, serde_json::json!({"styles": null}));

        let message: ContentMessage =
            serde_json::from_str(r#"{"styles": {"maxWidth": "10px", "marginLeft": null}}"#).unwrap();
        assert_eq!(message.styles.unwrap()["marginLeft"], None);
    }

    #[test]
    fn test_apply_from_unstyled() {
        let message = style_message(Some(&default_global_styles()));
        let (state, ops) = TabStyle::Unstyled.receive(&message);

        assert_eq!(ops, vec![set("margin-left", "200px"), set("max-width", "1000px")]);
        assert_eq!(state, TabStyle::Styled(default_global_styles()));
    }

    #[test]
    fn test_restyle_clears_previous_first() {
        let (styled, _) = TabStyle::Unstyled.receive(&style_message(Some(&default_global_styles())));

        let mut own = StyleMap::new();
        own.insert("maxWidth".into(), "800px".into());
        let (state, ops) = styled.receive(&style_message(Some(&own)));

        assert_eq!(
            ops,
            vec![remove("margin-left"), remove("max-width"), set("max-width", "800px")]
        );
        let TabStyle::Styled(applied) = state else {
            panic!("expected styled state");
        };
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (styled, _) = TabStyle::Unstyled.receive(&style_message(Some(&default_global_styles())));

        let (once, ops) = styled.receive(&ContentMessage::clear());
        assert_eq!(once, TabStyle::Unstyled);
        assert_eq!(ops.len(), 2);

        let (twice, ops) = once.receive(&ContentMessage::clear());
        assert_eq!(twice, once);
        assert!(ops.is_empty());
    }
}
