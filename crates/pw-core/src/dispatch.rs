//! Tab Styling Dispatcher
//!
//! Computes the style decision for tabs and hands it to the content-script
//! boundary. Per-tab failures are logged and never fail a sweep.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::content::{style_message, ContentMessage};
use crate::error::TransportError;
use crate::state::PersistedState;
use crate::style::{resolve, StyleMap};
use crate::url::normalize;

/// Browser tab identifier.
pub type TabId = i32;

/// An open browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tab {
    pub id: TabId,
    /// Absent when the extension may not read the tab's URL
    #[serde(default)]
    pub url: Option<String>,
}

/// `webNavigation.onCompleted` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NavigationEvent {
    pub url: String,
    pub tab_id: TabId,
}

// =============================================================================
// Transport
// =============================================================================

/// The browser's tab and messaging capabilities.
pub trait TabMessenger {
    /// The active tab of the last focused window.
    fn active_tab(&mut self) -> Result<Tab, TransportError>;

    /// All open tabs.
    fn tabs(&mut self) -> Result<Vec<Tab>, TransportError>;

    /// Deliver a message to a tab's content script.
    fn send(&mut self, tab_id: TabId, message: &ContentMessage) -> Result<(), TransportError>;
}

// =============================================================================
// Decisions
// =============================================================================

/// Outcome of styling one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOutcome {
    Styled,
    Cleared,
    /// URL missing or not stylable
    Skipped,
    /// Content script did not answer
    Unreachable,
}

/// Per-sweep counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub styled: usize,
    pub cleared: usize,
    pub skipped: usize,
    pub unreachable: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: TabOutcome) {
        match outcome {
            TabOutcome::Styled => self.styled += 1,
            TabOutcome::Cleared => self.cleared += 1,
            TabOutcome::Skipped => self.skipped += 1,
            TabOutcome::Unreachable => self.unreachable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.styled + self.cleared + self.skipped + self.unreachable
    }
}

/// Styles for a normalized URL under the current state, `None` to clear.
pub fn decide<'a>(state: &'a PersistedState, url: &str) -> Option<&'a StyleMap> {
    let matched = state.sites.best_match(url);
    let decision = resolve(matched, &state.global_styles, state.inverse);
    log::debug!(
        "{url}: best match {:?}, inverse {}, {}",
        matched.map(|site| site.url.as_str()),
        state.inverse,
        if decision.is_some() { "styled" } else { "cleared" }
    );
    decision
}

// =============================================================================
// Dispatch
// =============================================================================

/// The message a page showing `url` should apply. Unstylable URLs are cleared.
pub fn message_for_url(state: &PersistedState, url: &str) -> ContentMessage {
    match normalize(url) {
        Ok(url) => style_message(decide(state, &url)),
        Err(e) => {
            log::debug!("{e}: answering with a clear message");
            ContentMessage::clear()
        }
    }
}

/// Send one decision to one tab.
pub fn dispatch_to_tab<M: TabMessenger + ?Sized>(
    tabs: &mut M,
    tab_id: TabId,
    decision: Option<&StyleMap>,
) -> Result<(), TransportError> {
    tabs.send(tab_id, &style_message(decision))
}

/// Resolve and dispatch for one tab showing `url`.
pub fn apply_to_tab<M: TabMessenger + ?Sized>(
    state: &PersistedState,
    tabs: &mut M,
    url: &str,
    tab_id: TabId,
) -> TabOutcome {
    let url = match normalize(url) {
        Ok(url) => url,
        Err(e) => {
            log::info!("Skipping tab {tab_id}: {e}");
            return TabOutcome::Skipped;
        }
    };

    let decision = decide(state, &url);
    match dispatch_to_tab(tabs, tab_id, decision) {
        Ok(()) if decision.is_some() => TabOutcome::Styled,
        Ok(()) => TabOutcome::Cleared,
        Err(e) => {
            log::warn!("Cannot modify tab with url {url} (tab id {tab_id}): {e}");
            TabOutcome::Unreachable
        }
    }
}

/// Re-dispatch to every open tab.
///
/// Tabs are independent: one failing never stops the others.
pub fn dispatch_to_all<M: TabMessenger + ?Sized>(state: &PersistedState, tabs: &mut M) -> SweepReport {
    let mut report = SweepReport::default();

    let open = match tabs.tabs() {
        Ok(open) => open,
        Err(e) => {
            log::warn!("Could not enumerate tabs: {e}");
            return report;
        }
    };

    for tab in open {
        let outcome = match &tab.url {
            Some(url) => apply_to_tab(state, tabs, url, tab.id),
            None => {
                log::info!("Skipping tab {}: no readable URL", tab.id);
                TabOutcome::Skipped
            }
        };
        report.record(outcome);
    }

    log::debug!("sweep finished: {report:?}");
    report
}
