//! WebAssembly bindings for PageWidth
//!
//! The background worker may be evicted between events, so nothing here
//! keeps extension state. Each background entry point takes the stored state
//! blob and returns `{response?, state?, messages}`: the new blob to write
//! back (only when it changed) and the content messages to deliver. The JS
//! glue awaits one call's storage write before issuing the next.

mod logger;

use std::cell::RefCell;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use pw_core::dispatch::{apply_to_tab, dispatch_to_all};
use pw_core::{
    ContentMessage, Error, MemoryStore, NavigationEvent, PersistedState, Request, Response, Router, StyleOp, Tab,
    TabId, TabMessenger, TabStyle, TransportError,
};

// =============================================================================
// Background
// =============================================================================

/// A content message addressed to one tab.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Outgoing {
    tab_id: TabId,
    message: ContentMessage,
}

/// Tab snapshot supplied by the JS side; sends are queued for it to deliver.
#[derive(Default)]
struct Outbox {
    active: Option<Tab>,
    tabs: Vec<Tab>,
    messages: Vec<Outgoing>,
}

impl TabMessenger for Outbox {
    fn active_tab(&mut self) -> Result<Tab, TransportError> {
        self.active.clone().ok_or(TransportError::NoActiveTab)
    }

    fn tabs(&mut self) -> Result<Vec<Tab>, TransportError> {
        Ok(self.tabs.clone())
    }

    fn send(&mut self, tab_id: TabId, message: &ContentMessage) -> Result<(), TransportError> {
        self.messages.push(Outgoing {
            tab_id,
            message: message.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Effects {
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<PersistedState>,
    messages: Vec<Outgoing>,
}

impl Effects {
    fn failed(error: &Error) -> Self {
        Self {
            response: Some(Response::error(error)),
            state: None,
            messages: Vec::new(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"messages":[],"error":"{e}"}}"#))
    }
}

fn parse_state(json: &str) -> Result<PersistedState, Error> {
    match json.trim() {
        "" | "null" => Ok(PersistedState::default()),
        json => Ok(PersistedState::from_json(json)?),
    }
}

fn parse_tabs(json: &str) -> Result<Vec<Tab>, Error> {
    match json.trim() {
        "" | "null" => Ok(Vec::new()),
        json => serde_json::from_str(json).map_err(|e| Error::Request(format!("bad tab list: {e}"))),
    }
}

fn parse_active_tab(json: &str) -> Result<Option<Tab>, Error> {
    match json.trim() {
        "" | "null" => Ok(None),
        json => serde_json::from_str(json)
            .map(Some)
            .map_err(|e| Error::Request(format!("bad active tab: {e}"))),
    }
}

fn handle_message_json(state_json: &str, request_json: &str, active_json: &str, tabs_json: &str) -> String {
    let setup = parse_state(state_json).and_then(|state| {
        Ok((state, parse_active_tab(active_json)?, parse_tabs(tabs_json)?))
    });
    let (state, active, tabs) = match setup {
        Ok(setup) => setup,
        Err(e) => return Effects::failed(&e).to_json(),
    };

    let mut store = MemoryStore::with_state(state);
    let mut outbox = Outbox {
        active,
        tabs,
        messages: Vec::new(),
    };
    let response = Router::new(&mut store, &mut outbox).handle_json(request_json);

    let changed = store.flush_count() > 0;
    Effects {
        response: Some(response),
        state: if changed { store.into_state() } else { None },
        messages: outbox.messages,
    }
    .to_json()
}

fn navigation_json(state_json: &str, event_json: &str) -> String {
    let setup = parse_state(state_json).and_then(|state| {
        let event: NavigationEvent =
            serde_json::from_str(event_json).map_err(|e| Error::Request(format!("bad navigation event: {e}")))?;
        Ok((state, event))
    });
    let (state, event) = match setup {
        Ok(setup) => setup,
        Err(e) => return Effects::failed(&e).to_json(),
    };

    let mut outbox = Outbox::default();
    apply_to_tab(&state, &mut outbox, &event.url, event.tab_id);
    Effects {
        response: None,
        state: None,
        messages: outbox.messages,
    }
    .to_json()
}

fn sweep_json(state_json: &str, tabs_json: &str) -> String {
    let setup = parse_state(state_json).and_then(|state| Ok((state, parse_tabs(tabs_json)?)));
    let (state, tabs) = match setup {
        Ok(setup) => setup,
        Err(e) => return Effects::failed(&e).to_json(),
    };

    let mut outbox = Outbox {
        tabs,
        ..Outbox::default()
    };
    dispatch_to_all(&state, &mut outbox);
    Effects {
        response: None,
        state: None,
        messages: outbox.messages,
    }
    .to_json()
}

fn install_json(state_json: &str, reason: &str) -> String {
    let mut store = match state_json.trim() {
        "" | "null" => MemoryStore::new(),
        json => match PersistedState::from_json(json) {
            Ok(state) => MemoryStore::with_state(state),
            Err(e) => return Effects::failed(&Error::from(e)).to_json(),
        },
    };

    let mut outbox = Outbox::default();
    let written = Router::new(&mut store, &mut outbox).on_installed(reason);
    match written {
        Ok(true) => Effects {
            response: None,
            state: store.into_state(),
            messages: Vec::new(),
        }
        .to_json(),
        Ok(false) => Effects {
            response: None,
            state: None,
            messages: Vec::new(),
        }
        .to_json(),
        Err(e) => Effects::failed(&Error::from(e)).to_json(),
    }
}

fn to_json_string(value: &JsValue) -> Result<String, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(String::new());
    }
    if let Some(s) = value.as_string() {
        return Ok(s);
    }
    js_sys::JSON::stringify(value).map(String::from)
}

fn parse_js(json: &str) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(json)
}

#[wasm_bindgen]
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    logger::init(level);
}

/// Handle a popup message.
///
/// `state` is the whole `storage.local` object, `active_tab` and `tabs` are
/// `{id, url}` snapshots taken by the caller.
#[wasm_bindgen]
pub fn handle_message(state: JsValue, request: JsValue, active_tab: JsValue, tabs: JsValue) -> Result<JsValue, JsValue> {
    let effects = handle_message_json(
        &to_json_string(&state)?,
        &to_json_string(&request)?,
        &to_json_string(&active_tab)?,
        &to_json_string(&tabs)?,
    );
    parse_js(&effects)
}

/// Handle `webNavigation.onCompleted` (`{url, tabId}`).
#[wasm_bindgen]
pub fn handle_navigation(state: JsValue, event: JsValue) -> Result<JsValue, JsValue> {
    parse_js(&navigation_json(&to_json_string(&state)?, &to_json_string(&event)?))
}

/// Recompute the decision for every tab.
#[wasm_bindgen]
pub fn sweep_tabs(state: JsValue, tabs: JsValue) -> Result<JsValue, JsValue> {
    parse_js(&sweep_json(&to_json_string(&state)?, &to_json_string(&tabs)?))
}

/// Handle `runtime.onInstalled`.
#[wasm_bindgen]
pub fn handle_installed(state: JsValue, reason: &str) -> Result<JsValue, JsValue> {
    parse_js(&install_json(&to_json_string(&state)?, reason))
}

// =============================================================================
// Content Script
// =============================================================================

thread_local! {
    static TAB_STYLE: RefCell<TabStyle> = RefCell::new(TabStyle::Unstyled);
}

fn receive_message(json: &str) -> Result<Vec<StyleOp>, String> {
    let message: ContentMessage = match json.trim() {
        "" | "null" => ContentMessage::clear(),
        json => serde_json::from_str(json).map_err(|e| format!("bad content message: {e}"))?,
    };

    Ok(TAB_STYLE.with(|cell| {
        let (next, ops) = cell.borrow().receive(&message);
        *cell.borrow_mut() = next;
        ops
    }))
}

fn styles_request_json(url: &str) -> Result<String, String> {
    let request = Request::StylesFor { url: url.to_string() };
    serde_json::to_string(&request).map_err(|e| e.to_string())
}

/// The message a content script sends at document start to learn its
/// styling. Pass the background's reply to [`apply_content_message`].
#[wasm_bindgen]
pub fn styles_request(url: &str) -> Result<JsValue, JsValue> {
    let json = styles_request_json(url).map_err(|e| JsValue::from(js_sys::Error::new(&e)))?;
    parse_js(&json)
}

/// Apply a `{styles}` message to `document.body`.
#[wasm_bindgen]
pub fn apply_content_message(message: JsValue) -> Result<(), JsValue> {
    let ops = receive_message(&to_json_string(&message)?).map_err(|e| JsValue::from(js_sys::Error::new(&e)))?;

    let body = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body())
        .ok_or_else(|| JsValue::from(js_sys::Error::new("Document has no body")))?;
    let style = body.style();

    for op in ops {
        match op {
            StyleOp::Set { property, value } => style.set_property(&property, &value)?,
            StyleOp::Remove { property } => {
                style.remove_property(&property)?;
            }
        }
    }

    Ok(())
}

/// Whether the extension currently styles this page.
#[wasm_bindgen]
pub fn is_page_styled() -> bool {
    TAB_STYLE.with(|cell| matches!(*cell.borrow(), TabStyle::Styled(_)))
}
