//! PageWidth Core Library
//!
//! This crate provides the site-matching and style-resolution engine for the
//! PageWidth extension, which limits a page's width by setting inline
//! `max-width` / `margin-left` on the body of matching sites.
//!
//! # Architecture
//!
//! Users register URL patterns (`*` wildcards). For a navigated URL the
//! longest matching pattern wins; its enable flag, the global inverse flag
//! and its "use own styles" flag decide what the content script applies.
//! Browser storage and tab messaging are injected through [`StateStore`]
//! and [`TabMessenger`], so the whole engine runs without a browser.
//!
//! # Modules
//!
//! - `url`: URL cleaning, validation and sibling patterns
//! - `pattern`: Right-anchored wildcard matching
//! - `site`: The persisted site rule
//! - `registry`: Ordered site collection with best-match lookup
//! - `style`: Style value parsing and style resolution
//! - `state`: Persisted state blob and the store abstraction
//! - `content`: Content-script message and tab state machine
//! - `dispatch`: Per-tab and all-tab style dispatch
//! - `router`: Message, navigation and install handling
//! - `error`: Error taxonomy

pub mod content;
pub mod dispatch;
pub mod error;
pub mod pattern;
pub mod registry;
pub mod router;
pub mod site;
pub mod state;
pub mod style;
pub mod url;

// Re-export commonly used types
pub use content::{style_message, ContentMessage, StyleOp, TabStyle};
pub use dispatch::{dispatch_to_all, dispatch_to_tab, NavigationEvent, SweepReport, Tab, TabId, TabMessenger};
pub use error::{Error, InvalidValueError, StoreError, TransportError, ValidationError};
pub use pattern::{matches, Pattern};
pub use registry::SiteRegistry;
pub use router::{apply, Request, Response, Router};
pub use site::Site;
pub use state::{MemoryStore, PersistedState, StateStore};
pub use style::{parse_style, resolve, StyleMap, StyleValue};
pub use url::{derive_sibling_pattern, normalize};
