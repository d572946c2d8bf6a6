//! Backend collaborator contracts
//!
//! The desk orchestrates three independently-owned backend services:
//! credential verification ([`AuthStore`]), session storage
//! ([`SessionStore`]), and user-record storage ([`UserStore`]). The services
//! themselves are out of scope here — the desk depends on these traits only,
//! never on concrete backend types, so hosts can plug in whatever storage
//! they own and tests can substitute doubles.
//!
//! Each backend provides its own internal consistency. In particular the
//! session store, not the desk, enforces one live session per user id: it is
//! required to delete any pre-existing session for a user as part of
//! [`SessionStore::create`].
//!
//! In-memory reference implementations live in [`memory`].

use std::{collections::HashSet, fmt::Debug, time::Duration};

use async_trait::async_trait;

use crate::{Record, Result};

pub mod errors;
pub mod memory;

pub use errors::StoreError;
pub use memory::{MemoryAuth, MemorySessions, MemoryUsers};

/// Options applied when creating a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// How long the session stays live without being refreshed.
    pub timeout: Duration,
}

/// Credential verification backend.
///
/// Password hashing algorithm choice belongs entirely to the implementation;
/// the desk never sees a hash.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Verify a password for an identity.
    ///
    /// # Errors
    /// [`StoreError::PasswordMismatch`] with the backend's own message when
    /// verification fails; [`StoreError::IdentityNotFound`] when no
    /// credentials are stored for `user_id`.
    async fn check_password(&self, user_id: &str, password: &str) -> Result<()>;

    /// Set (or replace) the password for an identity, creating it if needed.
    async fn set_password(&self, user_id: &str, password: &str) -> Result<()>;

    /// Delete an identity and its credentials.
    async fn delete_identity(&self, user_id: &str) -> Result<()>;

    /// Whether credentials are stored for the given user id.
    async fn identity_exists(&self, user_id: &str) -> Result<bool>;
}

/// Session storage backend.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session for `user_id`.
    ///
    /// Implementations MUST delete any pre-existing session for the same
    /// `user_id` as part of creation; the desk relies on, but does not
    /// itself enforce, one live session per user.
    async fn create(&self, user_id: &str, opts: SessionOptions) -> Result<Box<dyn Session>>;

    /// Fetch a live session.
    ///
    /// # Errors
    /// [`StoreError::SessionExpired`] if the session exists but its lifetime
    /// has elapsed, [`StoreError::SessionNotFound`] if it does not exist.
    async fn get(&self, session_id: &str) -> Result<Box<dyn Session>>;

    /// Delete a session.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Purge all expired sessions and report the surviving session ids.
    ///
    /// The desk calls this once per open, then prunes its key map against the
    /// surviving set — the mechanism that reconciles the two independently
    /// managed stores without expiry notifications.
    async fn purge_expired(&self) -> Result<HashSet<String>>;
}

/// A handle to one session's state.
///
/// Data reads are against a point-in-time snapshot taken when the handle was
/// fetched; mutations are local until [`Session::save`] writes the whole data
/// map back to the store.
#[async_trait]
pub trait Session: Send + Sync + Debug {
    /// The session's identifier.
    fn id(&self) -> &str;

    /// The user (or generated guest) id this session belongs to.
    fn user_id(&self) -> &str;

    /// The session's data snapshot.
    fn data(&self) -> &Record;

    /// Replace the local data snapshot. Not persisted until [`Session::save`].
    fn set_data(&mut self, data: Record);

    /// Whether the session is currently live.
    fn is_active(&self) -> bool;

    /// Whether the session's lifetime has elapsed.
    fn is_expired(&self) -> bool;

    /// Write the data snapshot back to the session store.
    async fn save(&mut self) -> Result<()>;
}

/// User-record storage backend.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a new user record. The record must carry a string `user_id`.
    ///
    /// # Errors
    /// [`StoreError::UserAlreadyExists`] if a record with the same `user_id`
    /// is already registered.
    async fn register(&self, record: Record) -> Result<()>;

    /// Fetch a user record by id.
    async fn get(&self, user_id: &str) -> Result<Record>;

    /// Shallow-merge `patch` into an existing record: keys present in the
    /// patch overwrite, all other stored keys are preserved.
    async fn update(&self, user_id: &str, patch: Record) -> Result<()>;

    /// Delete a user record.
    async fn delete(&self, user_id: &str) -> Result<()>;

    /// List user ids, optionally restricted to records whose fields equal
    /// every field of `filter`.
    async fn list(&self, filter: Option<&Record>) -> Result<Vec<String>>;
}
