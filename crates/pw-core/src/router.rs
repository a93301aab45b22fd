//! Message/Event Router
//!
//! Inbound popup messages, navigation events and install events all end up
//! here. [`apply`] is the pure state transition for every mutating action;
//! [`Router`] wraps it with the injected store and tab messenger and turns
//! every failure into a structured [`Response`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::content::ContentMessage;
use crate::dispatch::{
    apply_to_tab, dispatch_to_all, message_for_url, NavigationEvent, SweepReport, TabMessenger, TabOutcome,
};
use crate::error::{Error, StoreError, TransportError, ValidationError};
use crate::site::Site;
use crate::state::{mutate, PersistedState, StateStore};
use crate::style::{validate_styles, StyleMap};
use crate::url::normalize;

// =============================================================================
// Protocol
// =============================================================================

/// A message from the popup, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export)]
pub enum Request {
    Info,
    AddSite {
        url: String,
        #[serde(default, rename = "includeSiblings")]
        include_siblings: bool,
    },
    Remove {
        url: String,
    },
    UpdateStyles {
        styles: StyleMap,
    },
    ToggleInverse {
        value: String,
    },
    ToggleSite {
        url: String,
        checked: bool,
    },
    UpdateSite {
        url: String,
        site: Site,
    },
    /// Sent by a content script at document start with its own URL
    StylesFor {
        url: String,
    },
}

impl Request {
    /// Decode a request, mapping unknown actions and bad payloads to `RequestError`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Request(e.to_string()))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::AddSite { .. } => "add_site",
            Self::Remove { .. } => "remove",
            Self::UpdateStyles { .. } => "update_styles",
            Self::ToggleInverse { .. } => "toggle_inverse",
            Self::ToggleSite { .. } => "toggle_site",
            Self::UpdateSite { .. } => "update_site",
            Self::StylesFor { .. } => "styles_for",
        }
    }
}

/// Reply to the `info` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InfoReply {
    pub tab_url: String,
    pub matching_site: Option<Site>,
    pub storage: PersistedState,
}

/// `{name, message}` of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.to_string(),
        }
    }
}

/// Reply to any message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Response {
    Info(InfoReply),
    /// `status` is always `"error"`
    Error { status: String, error: ErrorBody },
    Done { status: String },
    /// Reply to `styles_for`
    Styles(ContentMessage),
}

impl Response {
    pub fn done(status: impl Into<String>) -> Self {
        Self::Done { status: status.into() }
    }

    pub fn error(error: &Error) -> Self {
        Self::Error {
            status: "error".to_string(),
            error: ErrorBody::from(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn to_json(&self) -> String {
        // Every field is a string, bool or string map
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","error":{{"name":"RequestError","message":"{e}"}}}}"#)
        })
    }
}

// =============================================================================
// State Transition
// =============================================================================

/// What a successful mutating action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Human-readable status for the popup
    pub status: String,
    /// Open tabs must be re-styled
    pub sweep: bool,
}

impl Applied {
    fn sweep(status: String) -> Self {
        Self { status, sweep: true }
    }
}

fn parse_inverse(value: &str) -> Result<bool, ValidationError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ValidationError::InvalidInverse(other.to_string())),
    }
}

/// Apply a mutating request to a state value.
///
/// `info` and `styles_for` only read state and are handled by [`Router`];
/// here they are no-ops. On error `state` may be partially modified and must
/// be discarded.
pub fn apply(state: &mut PersistedState, request: &Request) -> Result<Applied, Error> {
    match request {
        Request::Info | Request::StylesFor { .. } => Ok(Applied {
            status: "ok".to_string(),
            sweep: false,
        }),
        Request::AddSite { url, include_siblings } => {
            let site = state.sites.add(url, *include_siblings)?;
            Ok(Applied::sweep(format!("{} was added to storage successfully", site.url)))
        }
        Request::Remove { url } => {
            let site = state.sites.remove(url)?;
            Ok(Applied::sweep(format!("{} was removed successfully", site.url)))
        }
        Request::UpdateStyles { styles } => {
            validate_styles(styles)?;
            state.global_styles = styles.clone();
            Ok(Applied::sweep("Global styles updated".to_string()))
        }
        Request::ToggleInverse { value } => {
            state.inverse = parse_inverse(value)?;
            let mode = if state.inverse { "enabled" } else { "disabled" };
            Ok(Applied::sweep(format!("Inverse mode {mode}")))
        }
        Request::ToggleSite { url, checked } => {
            let url = normalize(url)?;
            let matched = state.sites.best_match(&url).cloned();
            match matched {
                Some(mut site) => {
                    let pattern = site.url.clone();
                    site.enabled = *checked;
                    state.sites.update(&pattern, site)?;
                    let verb = if *checked { "enabled" } else { "disabled" };
                    Ok(Applied::sweep(format!("{pattern} was {verb}")))
                }
                None if *checked => {
                    let site = state.sites.add(&url, false)?;
                    Ok(Applied::sweep(format!("{} was added to storage successfully", site.url)))
                }
                None => Ok(Applied {
                    status: format!("{url} is not registered"),
                    sweep: false,
                }),
            }
        }
        Request::UpdateSite { url, site } => {
            let site = state.sites.update(url, site.clone())?;
            Ok(Applied::sweep(format!("{} was updated successfully", site.url)))
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Background controller wired to a store and the browser's tabs.
pub struct Router<'a, S: ?Sized, M: ?Sized> {
    store: &'a mut S,
    tabs: &'a mut M,
}

impl<'a, S, M> Router<'a, S, M>
where
    S: StateStore + ?Sized,
    M: TabMessenger + ?Sized,
{
    pub fn new(store: &'a mut S, tabs: &'a mut M) -> Self {
        Self { store, tabs }
    }

    /// Handle a raw JSON message. Never fails.
    pub fn handle_json(&mut self, json: &str) -> Response {
        match Request::from_json(json) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                log::warn!("Rejected message: {e}");
                Response::error(&e)
            }
        }
    }

    /// Handle a decoded message. Never fails.
    pub fn handle(&mut self, request: &Request) -> Response {
        let result = match request {
            Request::Info => self.info().map(Response::Info),
            Request::StylesFor { url } => self
                .store
                .load()
                .map(|state| Response::Styles(message_for_url(&state, url)))
                .map_err(Error::from),
            _ => self.execute(request).map(Response::done),
        };

        result.unwrap_or_else(|e| {
            log::info!("{} failed: {e}", request.action());
            Response::error(&e)
        })
    }

    fn info(&mut self) -> Result<InfoReply, Error> {
        let tab = self.tabs.active_tab()?;
        let tab_url = tab.url.ok_or(TransportError::MissingUrl(tab.id))?;
        let storage = self.store.load()?;

        // Internal pages have no match, but the popup still shows them
        let matching_site = normalize(&tab_url)
            .ok()
            .and_then(|url| storage.sites.best_match(&url).cloned());

        Ok(InfoReply {
            tab_url,
            matching_site,
            storage,
        })
    }

    fn execute(&mut self, request: &Request) -> Result<String, Error> {
        let applied = mutate(&mut *self.store, |state| apply(state, request))?;
        if applied.sweep {
            self.sweep();
        }
        Ok(applied.status)
    }

    /// Re-style every open tab from the stored state.
    pub fn sweep(&mut self) -> SweepReport {
        match self.store.load() {
            Ok(state) => dispatch_to_all(&state, &mut *self.tabs),
            Err(e) => {
                log::warn!("Sweep skipped: {e}");
                SweepReport::default()
            }
        }
    }

    /// Style the tab that just finished navigating.
    pub fn on_navigation(&mut self, event: &NavigationEvent) -> TabOutcome {
        match self.store.load() {
            Ok(state) => apply_to_tab(&state, &mut *self.tabs, &event.url, event.tab_id),
            Err(e) => {
                log::warn!("Cannot style tab {}: {e}", event.tab_id);
                TabOutcome::Skipped
            }
        }
    }

    /// Write the install defaults on first install. Returns whether it did.
    pub fn on_installed(&mut self, reason: &str) -> Result<bool, StoreError> {
        if reason != "install" {
            log::debug!("onInstalled ({reason}): keeping stored state");
            return Ok(false);
        }
        log::info!("Writing install defaults");
        self.store.flush(&PersistedState::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::FakeTabs;
    use crate::dispatch::Tab;
    use crate::state::MemoryStore;

    fn active(url: &str) -> FakeTabs {
        let mut tabs = FakeTabs::with_tabs(&[(7, Some(url))]);
        tabs.active = Some(Tab {
            id: 7,
            url: Some(url.to_string()),
        });
        tabs
    }

    #[test]
    fn test_request_json() {
        let request = Request::from_json(r#"{"action": "add_site", "url": "a.com"}"#).unwrap();
        assert_eq!(
            request,
            Request::AddSite {
                url: "a.com".into(),
                include_siblings: false
            }
        );

        let request =
            Request::from_json(r#"{"action": "add_site", "url": "a.com/b", "includeSiblings": true}"#).unwrap();
        assert!(matches!(request, Request::AddSite { include_siblings: true, .. }));

        assert_eq!(Request::from_json(r#"{"action": "info"}"#).unwrap(), Request::Info);
        assert_eq!(Request::from_json(r#"{"action": "explode"}"#).unwrap_err().name(), "RequestError");
    }

    #[test]
    fn test_add_site_persists_and_sweeps() {
        let mut store = MemoryStore::new();
        let mut tabs = active("https://a.com/page");

        let response = Router::new(&mut store, &mut tabs).handle_json(r#"{"action":"add_site","url":"https://a.com/page"}"#);
        assert_eq!(response, Response::done("https://a.com/page was added to storage successfully"));

        let stored = store.state().unwrap();
        assert!(stored.sites.get("https://a.com/page").is_some());
        assert!(!tabs.message_for(7).unwrap().is_clear());
    }

    #[test]
    fn test_duplicate_is_structured_error() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);

        router.handle_json(r#"{"action":"add_site","url":"a.com"}"#);
        let response = router.handle_json(r#"{"action":"add_site","url":"a.com"}"#);

        let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "error",
                "error": {"name": "DuplicateError", "message": "a.com already exists"}
            })
        );
        assert_eq!(store.flush_count(), 1);
        assert_eq!(store.state().unwrap().sites.len(), 1);
    }

    #[test]
    fn test_remove_unknown() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let response = Router::new(&mut store, &mut tabs).handle(&Request::Remove { url: "x.com".into() });
        let Response::Error { error, .. } = response else {
            panic!("expected error");
        };
        assert_eq!(error.name, "NotFoundError");
    }

    #[test]
    fn test_update_styles_validates() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);

        let mut styles = StyleMap::new();
        styles.insert("maxWidth".into(), "-5px".into());
        let response = router.handle(&Request::UpdateStyles { styles: styles.clone() });
        assert!(response.is_error());

        styles.insert("maxWidth".into(), "60%".into());
        let response = router.handle(&Request::UpdateStyles { styles: styles.clone() });
        assert!(!response.is_error());
        assert_eq!(store.state().unwrap().global_styles, styles);
    }

    #[test]
    fn test_toggle_inverse() {
        let mut store = MemoryStore::new();
        let mut tabs = active("https://b.com");
        let mut router = Router::new(&mut store, &mut tabs);

        let response = router.handle_json(r#"{"action":"toggle_inverse","value":"true"}"#);
        assert_eq!(response, Response::done("Inverse mode enabled"));
        let response = router.handle_json(r#"{"action":"toggle_inverse","value":"maybe"}"#);
        assert!(response.is_error());

        assert!(store.state().unwrap().inverse);
        // Unmatched tab is styled once inverse is on
        assert!(!tabs.message_for(7).unwrap().is_clear());
    }

    #[test]
    fn test_toggle_site() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);

        router.handle(&Request::ToggleSite {
            url: "https://a.com/x".into(),
            checked: true,
        });
        router.handle(&Request::AddSite {
            url: "https://a.com/x/y".into(),
            include_siblings: true,
        });
        // Best match for y is the sibling pattern, which gets disabled
        let response = router.handle(&Request::ToggleSite {
            url: "https://a.com/x/y".into(),
            checked: false,
        });
        assert_eq!(response, Response::done("https://a.com/x/* was disabled"));

        let state = store.state().unwrap();
        assert!(state.sites.get("https://a.com/x").unwrap().enabled);
        assert!(!state.sites.get("https://a.com/x/*").unwrap().enabled);
    }

    #[test]
    fn test_toggle_site_unregistered_unchecked() {
        let mut store = MemoryStore::new();
        let mut tabs = active("https://a.com/x");
        let response = Router::new(&mut store, &mut tabs).handle(&Request::ToggleSite {
            url: "https://a.com/x".into(),
            checked: false,
        });

        assert_eq!(response, Response::done("https://a.com/x is not registered"));
        assert_eq!(store.flush_count(), 0);
        assert!(store.load().unwrap().sites.is_empty());
        assert!(tabs.sent.is_empty());
    }

    #[test]
    fn test_double_slash_rule_can_be_toggled_and_updated() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);

        let response = router.handle_json(r#"{"action":"add_site","url":"https://a.com//"}"#);
        assert_eq!(response, Response::done("https://a.com/ was added to storage successfully"));

        let response = router.handle(&Request::ToggleSite {
            url: "https://a.com//".into(),
            checked: false,
        });
        assert_eq!(response, Response::done("https://a.com/ was disabled"));

        let mut site = Site::new("https://a.com/");
        site.use_own_styles = true;
        site.styles.insert("maxWidth".into(), "40%".into());
        let response = router.handle(&Request::UpdateSite {
            url: "https://a.com/".into(),
            site,
        });
        assert!(!response.is_error(), "{response:?}");

        let sites = store.state().unwrap().sites.sites().to_vec();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url, "https://a.com/");
        assert!(sites[0].use_own_styles);
    }

    #[test]
    fn test_update_site_rejects_incompatible_url() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);
        router.handle_json(r#"{"action":"add_site","url":"a.com"}"#);

        let response = router.handle(&Request::UpdateSite {
            url: "a.com".into(),
            site: Site::new("chrome://x"),
        });
        let Response::Error { error, .. } = response else {
            panic!("expected error");
        };
        assert_eq!(error.name, "ValidationError");
        assert_eq!(store.flush_count(), 1);
        assert!(store.state().unwrap().sites.get("a.com").is_some());
    }

    #[test]
    fn test_styles_for_page_load() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);
        router.handle_json(r#"{"action":"add_site","url":"a.com/*"}"#);
        router.handle_json(r#"{"action":"add_site","url":"a.com/private/*"}"#);
        router.handle(&Request::ToggleSite {
            url: "https://a.com/private/x".into(),
            checked: false,
        });

        let Response::Styles(message) =
            router.handle_json(r#"{"action":"styles_for","url":"https://a.com/page?x=1"}"#)
        else {
            panic!("expected styles");
        };
        let styles = message.styles.unwrap();
        assert_eq!(styles["maxWidth"].as_deref(), Some("1000px"));
        assert_eq!(styles["marginLeft"].as_deref(), Some("200px"));

        let response = router.handle(&Request::StylesFor {
            url: "https://a.com/private/x".into(),
        });
        assert_eq!(response, Response::Styles(ContentMessage::clear()));

        let response = router.handle(&Request::StylesFor { url: "about:blank".into() });
        assert_eq!(response, Response::Styles(ContentMessage::clear()));
        assert_eq!(response.to_json(), r#"{"styles":null}"#);

        // Read-only: three mutations flushed, queries did not
        assert_eq!(store.flush_count(), 3);
    }

    #[test]
    fn test_update_site_own_styles() {
        let mut store = MemoryStore::new();
        let mut tabs = active("https://a.com");
        let mut router = Router::new(&mut store, &mut tabs);
        router.handle_json(r#"{"action":"add_site","url":"https://a.com"}"#);

        let response = router.handle_json(
            r#"{"action":"update_site","url":"https://a.com",
                "site":{"url":"https://a.com","useOwnStyles":true,"styles":{"maxWidth":"40%"}}}"#,
        );
        assert!(!response.is_error(), "{response:?}");

        let message = tabs.message_for(7).unwrap().styles.clone().unwrap();
        assert_eq!(message["maxWidth"].as_deref(), Some("40%"));
        assert_eq!(message["marginLeft"], None);
    }

    #[test]
    fn test_info() {
        let mut store = MemoryStore::new();
        let mut tabs = active("https://example.com/docs/page?x=1");
        let mut router = Router::new(&mut store, &mut tabs);
        router.handle_json(r#"{"action":"add_site","url":"example.com/*"}"#);
        router.handle_json(r#"{"action":"add_site","url":"example.com/docs/*"}"#);

        let Response::Info(info) = router.handle(&Request::Info) else {
            panic!("expected info");
        };
        assert_eq!(info.tab_url, "https://example.com/docs/page?x=1");
        assert_eq!(info.matching_site.unwrap().url, "example.com/docs/*");
        assert_eq!(info.storage.sites.len(), 2);
    }

    #[test]
    fn test_info_without_active_tab() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let response = Router::new(&mut store, &mut tabs).handle(&Request::Info);
        let Response::Error { error, .. } = response else {
            panic!("expected error");
        };
        assert_eq!(error.name, "TransportError");
    }

    #[test]
    fn test_navigation_and_install() {
        let mut store = MemoryStore::new();
        let mut tabs = FakeTabs::default();
        let mut router = Router::new(&mut store, &mut tabs);

        assert_eq!(router.on_installed("update"), Ok(false));
        assert_eq!(router.on_installed("install"), Ok(true));
        router.handle_json(r#"{"action":"add_site","url":"a.com/*"}"#);

        let event = NavigationEvent {
            url: "https://a.com/new".into(),
            tab_id: 3,
        };
        assert_eq!(router.on_navigation(&event), TabOutcome::Styled);
        tabs.dead.push(3);
        let mut router = Router::new(&mut store, &mut tabs);
        assert_eq!(router.on_navigation(&event), TabOutcome::Unreachable);
    }
}
