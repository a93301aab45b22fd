use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pw_core::{PersistedState, StateStore, StoreError};

/// State blob kept in a JSON file, written whole on every flush.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => PersistedState::from_json(&json),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{} does not exist, using defaults", self.path.display());
                Ok(PersistedState::default())
            }
            Err(e) => Err(StoreError::Unavailable(format!(
                "Failed to read '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn flush(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteFailed(format!("Failed to create '{}': {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(state).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to write '{}': {}", self.path.display(), e)))?;

        log::debug!("wrote {}", self.path.display());
        Ok(())
    }
}
