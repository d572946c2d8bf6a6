//! User handles
//!
//! A [`UserHandle`] is the value the desk returns from every lifecycle call:
//! immutable identity (user id and external key), a participation tier fixed
//! at construction, and tier-appropriate access to session data and the
//! owning user's backend record. After construction the application operates
//! on the handle directly, without re-traversing the desk.
//!
//! The tier is a strict function of what the handle carries: a `Visitor` has
//! neither session nor user data, a `Guest` has a session only, and a
//! `LoggedIn` handle has both plus a [`ProfileAccess`] strategy bound to the
//! owning user id.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    Record, Result,
    backend::{Session, UserStore},
    filters,
};

pub mod errors;

pub use errors::HandleError;

/// Participation tier of a user handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Anonymous: no session, no user record.
    Visitor,
    /// Temporary: a session, but no user record.
    Guest,
    /// Authenticated: a session and a user record.
    LoggedIn,
}

/// Read/write access to the owning user's backend record.
///
/// A small strategy value — the user-record collaborator plus the bound user
/// id — rather than a closure capturing orchestrator state. Present iff the
/// handle is logged in.
pub struct ProfileAccess {
    users: Arc<dyn UserStore>,
    user_id: String,
}

impl ProfileAccess {
    pub(crate) fn new(users: Arc<dyn UserStore>, user_id: impl Into<String>) -> Self {
        Self {
            users,
            user_id: user_id.into(),
        }
    }

    /// Fresh read of the owning user's record.
    async fn read(&self) -> Result<Record> {
        self.users.get(&self.user_id).await
    }

    /// Write a patch through to the backend record.
    async fn write(&self, patch: Record) -> Result<()> {
        self.users.update(&self.user_id, patch).await
    }
}

/// One participant's view of the system: identity, tier, session, and
/// profile snapshot.
pub struct UserHandle {
    user_id: String,
    user_key: String,
    tier: Tier,
    session: Option<Box<dyn Session>>,
    user_data: Option<Record>,
    profile: Option<ProfileAccess>,
}

impl UserHandle {
    pub(crate) fn visitor(user_id: impl Into<String>, user_key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_key: user_key.into(),
            tier: Tier::Visitor,
            session: None,
            user_data: None,
            profile: None,
        }
    }

    pub(crate) fn guest(
        user_id: impl Into<String>,
        user_key: impl Into<String>,
        session: Box<dyn Session>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_key: user_key.into(),
            tier: Tier::Guest,
            session: Some(session),
            user_data: None,
            profile: None,
        }
    }

    pub(crate) fn logged_in(
        user_id: impl Into<String>,
        user_key: impl Into<String>,
        session: Box<dyn Session>,
        user_data: Record,
        profile: ProfileAccess,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_key: user_key.into(),
            tier: Tier::LoggedIn,
            session: Some(session),
            user_data: Some(user_data),
            profile: Some(profile),
        }
    }

    // === Identity accessors ===

    /// Internal user identifier (a generated id for visitors and guests).
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The opaque external token this handle is reachable by.
    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    /// The backing session id, if the handle has a session.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id())
    }

    // === Tier predicates (fixed at construction) ===

    /// The handle's participation tier.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn is_visitor(&self) -> bool {
        self.tier == Tier::Visitor
    }

    pub fn is_guest(&self) -> bool {
        self.tier == Tier::Guest
    }

    pub fn is_logged_in(&self) -> bool {
        self.tier == Tier::LoggedIn
    }

    // === Session data ===

    /// Snapshot of the session data, or `None` for a visitor.
    pub fn session_data(&self) -> Option<Record> {
        self.session.as_ref().map(|s| s.data().clone())
    }

    /// Shallow-merge `patch` into the session data and save it back.
    ///
    /// Existing keys not present in `patch` are preserved; keys present in
    /// `patch` overwrite. A visitor has no session, so this is a no-op.
    pub async fn update_session_data(&mut self, patch: Record) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let mut merged = session.data().clone();
        merged.extend(patch);
        session.set_data(merged);
        session.save().await
    }

    // === User record (snapshot + write-through) ===

    /// The in-memory profile snapshot, or `None` below `LoggedIn`.
    pub fn user_data(&self) -> Option<&Record> {
        self.user_data.as_ref()
    }

    /// One field of the in-memory profile snapshot. Never touches the
    /// backend.
    pub fn user_field(&self, name: &str) -> Option<&Value> {
        self.user_data.as_ref().and_then(|data| data.get(name))
    }

    /// Write a profile patch through to the user-record backend and, on
    /// success, apply it to the in-memory snapshot.
    ///
    /// The patch passes the profile-update filter first, so identity and
    /// credential fields cannot be altered through a handle. On backend
    /// failure the snapshot is left untouched.
    pub async fn update_user_data(&mut self, patch: Record) -> Result<()> {
        let profile = self.profile.as_ref().ok_or(HandleError::NoProfile {
            operation: "update_user_data",
            tier: self.tier,
        })?;

        let patch = filters::PROFILE_UPDATE.apply(&patch)?;
        profile.write(patch.clone()).await?;

        if let Some(snapshot) = self.user_data.as_mut() {
            snapshot.extend(patch);
        }
        Ok(())
    }

    /// Replace the in-memory snapshot with a fresh read from the backend.
    ///
    /// Use when the application suspects the record was mutated externally.
    pub async fn refresh_user_data(&mut self) -> Result<()> {
        let profile = self.profile.as_ref().ok_or(HandleError::NoProfile {
            operation: "refresh_user_data",
            tier: self.tier,
        })?;

        self.user_data = Some(profile.read().await?);
        Ok(())
    }
}

impl std::fmt::Debug for UserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserHandle")
            .field("user_id", &self.user_id)
            .field("tier", &self.tier)
            .field("session_id", &self.session_id())
            .finish()
    }
}
