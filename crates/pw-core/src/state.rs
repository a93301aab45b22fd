//! Persisted extension state and the store abstraction.
//!
//! The whole state is one blob: every access reads it completely and every
//! mutation writes it back completely. No field-level updates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{Error, StoreError};
use crate::registry::SiteRegistry;
use crate::site::Site;
use crate::style::{default_global_styles, StyleMap};

// =============================================================================
// Persisted State
// =============================================================================

/// Everything kept in extension storage (`sites`, `globalStyles`, `inverse`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PersistedState {
    /// Style the pages that are *not* enabled instead
    #[serde(default)]
    pub inverse: bool,
    #[serde(default = "default_global_styles")]
    pub global_styles: StyleMap,
    #[serde(default)]
    #[ts(as = "Vec<Site>")]
    pub sites: SiteRegistry,
}

impl Default for PersistedState {
    /// The state written on install.
    fn default() -> Self {
        Self {
            inverse: false,
            global_styles: default_global_styles(),
            sites: SiteRegistry::default(),
        }
    }
}

impl PersistedState {
    /// Decode a state blob. Missing keys take their install defaults.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}

// =============================================================================
// Store
// =============================================================================

/// Key-value persistence for the state blob.
///
/// `load` on a store that was never written returns the install defaults.
pub trait StateStore {
    fn load(&self) -> Result<PersistedState, StoreError>;
    fn flush(&mut self, state: &PersistedState) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and by the wasm bindings.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<PersistedState>,
    flushes: usize,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Some(state),
            flushes: 0,
        }
    }

    /// The last flushed (or seeded) state.
    pub fn state(&self) -> Option<&PersistedState> {
        self.state.as_ref()
    }

    pub fn into_state(self) -> Option<PersistedState> {
        self.state
    }

    /// Number of successful flushes.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.state.clone().unwrap_or_default())
    }

    fn flush(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        self.flushes += 1;
        Ok(())
    }
}

/// Load, apply `f`, and flush only if `f` succeeded and changed the state.
///
/// The store stays exclusively borrowed for the whole read-modify-write, so
/// mutations through one store are applied one at a time in call order.
pub fn mutate<S, T, F>(store: &mut S, f: F) -> Result<T, Error>
where
    S: StateStore + ?Sized,
    F: FnOnce(&mut PersistedState) -> Result<T, Error>,
{
    let before = store.load()?;
    let mut state = before.clone();
    let value = f(&mut state)?;
    if state != before {
        store.flush(&state)?;
    }
    Ok(value)
}
