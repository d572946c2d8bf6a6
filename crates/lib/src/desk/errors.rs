//! Error types for the desk orchestrator

use std::path::PathBuf;

use thiserror::Error;

/// Errors originating in the desk itself (as opposed to relayed collaborator
/// failures, which surface as [`StoreError`](crate::backend::StoreError)).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeskError {
    /// The desk storage location does not exist.
    ///
    /// This is the sole fail-fast construction error: [`Desk::open`]
    /// (crate::Desk::open) returns it immediately rather than deferring the
    /// failure to first use.
    #[error("Desk storage location does not exist: {path}")]
    RootMissing {
        /// The missing storage location
        path: PathBuf,
    },

    /// No mapping exists for the presented user key.
    #[error("Unknown user key: {key}")]
    KeyNotFound {
        /// The key that did not resolve
        key: String,
    },

    /// The mapped session is gone; the stale mapping has been removed.
    #[error("Session for user key '{key}' has expired")]
    SessionExpired {
        /// The key whose session expired
        key: String,
    },
}

impl DeskError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeskError::KeyNotFound { .. })
    }

    /// Check if this error indicates an expired session.
    pub fn is_expired(&self) -> bool {
        matches!(self, DeskError::SessionExpired { .. })
    }
}

impl From<DeskError> for crate::Error {
    fn from(err: DeskError) -> Self {
        crate::Error::Desk(err)
    }
}
