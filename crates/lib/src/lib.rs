//!
//! Concierge: an identity-orchestration layer for applications that sit in
//! front of three independently-owned backend services and need one coherent
//! lifecycle API for anonymous visitors, temporary guests, and authenticated
//! users.
//!
//! ## Core Concepts
//!
//! * **Desk (`desk::Desk`)**: the orchestrator façade. One desk instance per
//!   storage location; it owns the key mapping and is the only component that
//!   talks to all three backend collaborators.
//! * **Collaborators (`backend`)**: the `AuthStore`, `SessionStore`, and
//!   `UserStore` traits. The desk depends on these interfaces only, never on
//!   concrete backend types. In-memory reference implementations are provided.
//! * **UserHandle (`handle::UserHandle`)**: an immutable-identity value object
//!   returned by desk lifecycle calls, representing one of three participation
//!   tiers (`Visitor`, `Guest`, `LoggedIn`) and exposing tier-appropriate
//!   session and profile operations.
//! * **KeyMap (`keymap::KeyMap`)**: the persisted mapping from opaque external
//!   tokens to internal `(user_id, session_id)` pairs, reconciled against the
//!   session store by a synchronization pass at desk open.
//! * **ParameterFilters (`filters`)**: the field-set boundary that keeps
//!   credentials out of the user and session stores and identity fields out of
//!   generic update calls.
//!
//! Internal identifiers never cross the API boundary: applications hold opaque
//! user keys (e.g., in a cookie) and exchange them for a `UserHandle` via
//! [`Desk::restore_user`](desk::Desk::restore_user).

pub mod backend;
pub mod clock;
pub mod desk;
pub mod filters;
pub mod handle;
pub mod keymap;

pub use clock::{Clock, SystemClock};
pub use desk::{Desk, DeskConfig, RemovalReport, VerifyReport};
pub use filters::Record;
pub use handle::{Tier, UserHandle};

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Concierge library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Concierge library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured validation errors from the parameter filters
    #[error(transparent)]
    Filter(filters::FilterError),

    /// Structured errors relayed from a backend collaborator
    #[error(transparent)]
    Store(backend::StoreError),

    /// Structured errors from user handle operations
    #[error(transparent)]
    Handle(handle::HandleError),

    /// Structured errors from the desk orchestrator
    #[error(transparent)]
    Desk(desk::DeskError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Filter(_) => "filters",
            Error::Store(_) => "backend",
            Error::Handle(_) => "handle",
            Error::Desk(_) => "desk",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(err) => err.is_not_found(),
            Error::Desk(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates an expired session.
    ///
    /// Expiry is distinguished from plain not-found because it triggers
    /// self-healing removal of the stale key mapping.
    pub fn is_expired(&self) -> bool {
        match self {
            Error::Store(err) => err.is_expired(),
            Error::Desk(err) => err.is_expired(),
            _ => false,
        }
    }

    /// Check if this error was caught by local validation, before any
    /// backend call was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Filter(_))
    }

    /// Check if this error is a failed credential check.
    pub fn is_authentication(&self) -> bool {
        match self {
            Error::Store(err) => err.is_authentication(),
            _ => false,
        }
    }
}
