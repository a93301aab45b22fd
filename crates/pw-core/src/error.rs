//! Error taxonomy shared by every component.
//!
//! Each concern has its own `thiserror` enum. [`Error`] unifies them at the
//! router boundary, where [`Error::name`] becomes the `name` field of the
//! structured error response.

use crate::dispatch::TabId;

/// Rejected URL or pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No URL specified")]
    MissingUrl,
    #[error("URL \"{0}\" is incompatible with this extension")]
    Incompatible(String),
    #[error("Inverse value must be \"true\" or \"false\", got \"{0}\"")]
    InvalidInverse(String),
}

/// Rejected CSS length value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidValueError {
    #[error("Missing numeric value")]
    MissingNumber,
    #[error("Invalid numeric value")]
    InvalidNumber,
    #[error("Value must not be negative")]
    Negative,
    #[error("Missing unit")]
    MissingUnit,
    #[error("Invalid unit. Must be one of 'px', '%'")]
    InvalidUnit,
}

/// Failure talking to a tab's content script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Could not get active tab")]
    NoActiveTab,
    #[error("Could not get URL of tab {0}")]
    MissingUrl(TabId),
    #[error("Receiving end does not exist in tab {0}")]
    NoReceiver(TabId),
    #[error("Tab transport failed: {0}")]
    Other(String),
}

/// Failure reading or writing the persisted state blob.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("State unavailable: {0}")]
    Unavailable(String),
    #[error("State is corrupt: {0}")]
    Corrupt(String),
    #[error("Failed to write state: {0}")]
    WriteFailed(String),
}

/// Any error a request can end in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidValue(#[from] InvalidValueError),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Malformed request: {0}")]
    Request(String),
}

impl Error {
    /// Stable error name surfaced to the popup.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::InvalidValue(_) => "InvalidValueError",
            Self::Duplicate(_) => "DuplicateError",
            Self::NotFound(_) => "NotFoundError",
            Self::Transport(_) => "TransportError",
            Self::Store(_) => "StorageError",
            Self::Request(_) => "RequestError",
        }
    }
}
