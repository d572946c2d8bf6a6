//! Error types for backend collaborators
//!
//! The desk relays these errors without reinterpreting them; retry policy, if
//! any, belongs to the collaborator or a layer above the desk.

use thiserror::Error;

/// Errors that can occur inside a backend collaborator.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No user record exists for the given id.
    #[error("User not found: {user_id}")]
    UserNotFound {
        /// The user id that was not found
        user_id: String,
    },

    /// A user record already exists for the given id.
    #[error("User already exists: {user_id}")]
    UserAlreadyExists {
        /// The user id that already exists
        user_id: String,
    },

    /// No session exists for the given id.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The session id that was not found
        session_id: String,
    },

    /// A session exists but its lifetime has elapsed.
    ///
    /// Distinguished from [`StoreError::SessionNotFound`] because expiry
    /// triggers self-healing removal of the stale key mapping.
    #[error("Session expired: {session_id}")]
    SessionExpired {
        /// The session id that expired
        session_id: String,
    },

    /// No credential identity exists for the given user id.
    #[error("Identity not found: {user_id}")]
    IdentityNotFound {
        /// The user id with no stored credentials
        user_id: String,
    },

    /// The supplied password did not verify.
    ///
    /// The message is sourced from the credential backend and passed through
    /// verbatim.
    #[error("{message}")]
    PasswordMismatch {
        /// The backend's own description of the failure
        message: String,
    },

    /// A record was structurally unusable by the store.
    #[error("Invalid record: {reason}")]
    InvalidRecord {
        /// Why the record was rejected
        reason: String,
    },

    /// Opaque failure relayed from a collaborator.
    #[error("Backend unavailable: {reason}")]
    Unavailable {
        /// The collaborator's failure message, not reinterpreted
        reason: String,
    },
}

impl StoreError {
    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::UserNotFound { .. }
                | StoreError::SessionNotFound { .. }
                | StoreError::IdentityNotFound { .. }
        )
    }

    /// Check if this error indicates an expired session.
    pub fn is_expired(&self) -> bool {
        matches!(self, StoreError::SessionExpired { .. })
    }

    /// Check if this error is a failed credential check.
    pub fn is_authentication(&self) -> bool {
        matches!(self, StoreError::PasswordMismatch { .. })
    }

    /// Check if this error indicates a resource already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::UserAlreadyExists { .. })
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
