//!
//! Provides the orchestrator façade (`Desk`) and its configuration.
//!
//! A `Desk` fronts the three backend collaborators with one lifecycle API:
//! admit anonymous visitors, check in temporary guests, log in authenticated
//! users, convert a guest into a freshly-registered user without losing their
//! session data, and restore any of these from the opaque key the application
//! holds. It also carries the account-administration surface (add, remove,
//! verify, update, list).
//!
//! One desk instance owns one [`KeyMap`]; all map mutations — login, logout,
//! check-in, conversion, restore self-healing, the open-time synchronization
//! pass — are serialized behind a single async mutex, so concurrent requests
//! cannot lose snapshot writes to each other.
//!
//! Operations across the three backends are best-effort, not atomic: the only
//! automatic recovery is the compensating profile delete when a password set
//! fails, and a failure during that rollback is logged and swallowed, never
//! escalated.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    Record, Result,
    backend::{AuthStore, SessionOptions, SessionStore, UserStore},
    filters,
    handle::{ProfileAccess, UserHandle},
    keymap::{KeyMap, generate_key},
};

pub mod config;
pub mod errors;

pub use config::DeskConfig;
pub use errors::DeskError;


/// Outcome of [`Desk::remove_user`]: which stores the user was deleted from,
/// and which deletions failed.
///
/// Removal deliberately never fails outright — partial cleanup is acceptable
/// and is made visible here rather than swallowed.
#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    /// Stores the user was successfully deleted from
    /// (`"users"`, `"auth"`, `"sessions"`, `"keymap"`).
    pub deleted_from: Vec<String>,
    /// One message per store that failed to delete.
    pub warnings: Vec<String>,
}

/// Outcome of [`Desk::verify_user`].
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// True iff the user exists in both the credential and user-record
    /// stores.
    pub verified: bool,
    /// Non-fatal consistency warnings, raised when exactly one of the two
    /// stores knows the user.
    pub warnings: Vec<String>,
}

/// The identity-orchestrator façade for one desk.
///
/// Owns the key map and is the only component that talks directly to all
/// three backend collaborators. Lifecycle calls return a [`UserHandle`]; the
/// application thereafter operates on the handle without re-traversing the
/// desk.
pub struct Desk {
    config: DeskConfig,
    auth: Arc<dyn AuthStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    key_map: Mutex<KeyMap>,
}

impl Desk {
    /// Open a desk.
    ///
    /// Fails fast — with an error, not a failure record — if the storage
    /// location does not exist. On success the key-map snapshot is loaded and
    /// the synchronization pass runs: the session store purges its expired
    /// records, and every mapping whose session did not survive is pruned.
    ///
    /// # Errors
    /// [`DeskError::RootMissing`] if `config.root()` is not a directory;
    /// otherwise any key-map load or collaborator failure.
    pub async fn open(
        config: DeskConfig,
        auth: Arc<dyn AuthStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self> {
        if !config.root().is_dir() {
            return Err(DeskError::RootMissing {
                path: config.root().to_path_buf(),
            }
            .into());
        }

        let key_map = KeyMap::load(config.key_map_path())?;
        let desk = Self {
            config,
            auth,
            sessions,
            users,
            key_map: Mutex::new(key_map),
        };

        let pruned = desk.synchronize().await?;
        info!(
            root = %desk.config.root().display(),
            pruned,
            "desk opened"
        );
        Ok(desk)
    }

    /// The desk's configuration.
    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Reconcile the key map with the session store.
    ///
    /// Asks the session store to purge its expired records and report the
    /// surviving session ids, then removes every mapping whose session is not
    /// among the survivors. Runs once per [`Desk::open`]; safe to call again
    /// at any time, and safe to run concurrently with logins because both
    /// hold the key-map mutex.
    ///
    /// Returns the number of mappings removed.
    pub async fn synchronize(&self) -> Result<usize> {
        let active = self.sessions.purge_expired().await?;
        let mut map = self.key_map.lock().await;
        let removed = map.synchronize(&active)?;
        if removed > 0 {
            debug!(removed, "pruned stale key mappings");
        }
        Ok(removed)
    }

    // === Participation lifecycle ===

    /// Admit an anonymous visitor.
    ///
    /// Generates a fresh key and returns a `Visitor`-tier handle. No session
    /// is created and no storage is touched.
    pub fn admit_visitor(&self) -> UserHandle {
        let visitor_id = format!("visitor-{}", Uuid::new_v4());
        UserHandle::visitor(visitor_id, generate_key())
    }

    /// Check in a temporary guest.
    ///
    /// Creates a session for a generated guest id (no user record, no
    /// password), registers the key mapping, and returns a `Guest`-tier
    /// handle. The desk's default timeout applies when none is given.
    ///
    /// # Errors
    /// Session-store failures are surfaced verbatim, with no side effects.
    pub async fn checkin_guest(&self, timeout: Option<Duration>) -> Result<UserHandle> {
        let guest_id = format!("guest-{}", Uuid::new_v4());
        let session = self
            .sessions
            .create(&guest_id, self.session_opts(timeout))
            .await?;

        let guest_key = generate_key();
        {
            let mut map = self.key_map.lock().await;
            map.put(guest_key.clone(), guest_id.clone(), session.id())?;
        }

        debug!(guest_id, "guest checked in");
        Ok(UserHandle::guest(guest_id, guest_key, session))
    }

    /// Log in an authenticated user.
    ///
    /// Credentials pass the credential filter, the user record is fetched,
    /// the password is verified by the credential backend, and a new session
    /// is created. The session store deletes any pre-existing session for
    /// this user as part of creation, so a re-login orphans the previous key
    /// mapping; the orphan is cleaned up by the next synchronization pass, or
    /// earlier by an explicit logout.
    ///
    /// The returned `LoggedIn` handle carries a freshly generated key (never
    /// derived from the user id) and profile access bound to the user id.
    pub async fn login_user(
        &self,
        credentials: Record,
        timeout: Option<Duration>,
    ) -> Result<UserHandle> {
        let creds = filters::CREDENTIAL.apply(&credentials)?;
        let user_id = filters::required_str(&creds, &filters::CREDENTIAL, "user_id")?.to_string();
        let password = filters::required_str(&creds, &filters::CREDENTIAL, "password")?;

        let user_data = self.users.get(&user_id).await?;
        self.auth.check_password(&user_id, password).await?;

        let session = self
            .sessions
            .create(&user_id, self.session_opts(timeout))
            .await?;

        let user_key = generate_key();
        {
            let mut map = self.key_map.lock().await;
            map.put(user_key.clone(), user_id.clone(), session.id())?;
        }

        debug!(user_id, "user logged in");
        let profile = ProfileAccess::new(Arc::clone(&self.users), user_id.clone());
        Ok(UserHandle::logged_in(
            user_id, user_key, session, user_data, profile,
        ))
    }

    /// Convert a guest into a freshly-registered authenticated user.
    ///
    /// The guest's session data is snapshotted, a new account is created from
    /// `credentials` (with the same compensating rollback as
    /// [`Desk::add_user`]), the user is logged in, the guest's data is merged
    /// into the new session (guest keys win over same-named keys), and
    /// finally the guest session and its key mapping are discarded.
    ///
    /// Failure at any step after key resolution returns the underlying error
    /// and leaves already-completed steps in place: best-effort, not atomic.
    pub async fn login_guest(&self, credentials: Record, guest_key: &str) -> Result<UserHandle> {
        let entry = {
            let map = self.key_map.lock().await;
            map.get(guest_key)
                .cloned()
                .ok_or_else(|| DeskError::KeyNotFound {
                    key: guest_key.to_string(),
                })?
        };

        let guest_session = self.sessions.get(&entry.session_id).await?;
        let carried = guest_session.data().clone();

        self.add_user(credentials.clone()).await?;
        let mut handle = self.login_user(credentials, None).await?;

        if !carried.is_empty() {
            handle.update_session_data(carried).await?;
        }

        self.sessions.delete(&entry.session_id).await?;
        {
            let mut map = self.key_map.lock().await;
            map.remove(guest_key)?;
        }

        debug!(
            guest_id = entry.user_id,
            user_id = handle.user_id(),
            "guest converted to user"
        );
        Ok(handle)
    }

    /// Reconstruct a handle from an opaque user key (e.g., from a cookie).
    ///
    /// The key resolves through the map; the mapped session is fetched; then
    /// the tier is re-derived from the presence of a user record, since tier
    /// is never persisted: record present ⇒ `LoggedIn`, absent ⇒ `Guest`.
    ///
    /// If the session is missing or expired, the stale mapping is removed
    /// before failing with [`DeskError::SessionExpired`] — without this
    /// self-healing step the map would accumulate garbage between
    /// synchronization passes.
    pub async fn restore_user(&self, user_key: &str) -> Result<UserHandle> {
        let entry = {
            let map = self.key_map.lock().await;
            map.get(user_key)
                .cloned()
                .ok_or_else(|| DeskError::KeyNotFound {
                    key: user_key.to_string(),
                })?
        };

        let session = match self.sessions.get(&entry.session_id).await {
            Ok(session) => session,
            Err(err) if err.is_expired() || err.is_not_found() => {
                let mut map = self.key_map.lock().await;
                map.remove(user_key)?;
                debug!(user_key, "removed stale key mapping");
                return Err(DeskError::SessionExpired {
                    key: user_key.to_string(),
                }
                .into());
            }
            Err(err) => return Err(err),
        };

        match self.users.get(&entry.user_id).await {
            Ok(user_data) => {
                let profile = ProfileAccess::new(Arc::clone(&self.users), entry.user_id.clone());
                Ok(UserHandle::logged_in(
                    entry.user_id,
                    user_key,
                    session,
                    user_data,
                    profile,
                ))
            }
            Err(err) if err.is_not_found() => {
                Ok(UserHandle::guest(entry.user_id, user_key, session))
            }
            Err(err) => Err(err),
        }
    }

    /// Log out by session id.
    ///
    /// Verifies the session exists (a second logout on the same session fails
    /// here), deletes it, and removes the corresponding key mapping.
    pub async fn logout_user(&self, session_id: &str) -> Result<()> {
        // Existence check; missing or expired sessions fail here.
        self.sessions.get(session_id).await?;
        self.sessions.delete(session_id).await?;

        let mut map = self.key_map.lock().await;
        if let Some(entry) = map.find_by_session(session_id) {
            let key = entry.key.clone();
            map.remove(&key)?;
        }
        debug!(session_id, "session logged out");
        Ok(())
    }

    // === Account administration ===

    /// Create a user account.
    ///
    /// The record is split by the profile and credential filters — each
    /// failure is a distinct validation error (missing required profile
    /// fields vs. missing password). The profile is registered first, then
    /// the password is set; if the password set fails, the just-registered
    /// profile is deleted again (compensating rollback, best-effort) and the
    /// credential backend's error propagates.
    pub async fn add_user(&self, record: Record) -> Result<()> {
        let profile = filters::PROFILE.apply(&record)?;
        let creds = filters::CREDENTIAL.apply(&record)?;
        let user_id = filters::required_str(&creds, &filters::CREDENTIAL, "user_id")?;
        let password = filters::required_str(&creds, &filters::CREDENTIAL, "password")?;

        self.users.register(profile).await?;

        if let Err(err) = self.auth.set_password(user_id, password).await {
            if let Err(rollback_err) = self.users.delete(user_id).await {
                warn!(
                    user_id,
                    error = %rollback_err,
                    "profile rollback failed after password-set failure"
                );
            }
            return Err(err);
        }

        debug!(user_id, "user added");
        Ok(())
    }

    /// Remove a user from every store.
    ///
    /// Best-effort and non-transactional: every step is attempted regardless
    /// of earlier failures, and the call itself always succeeds. Per-store
    /// outcomes are reported in the [`RemovalReport`].
    pub async fn remove_user(&self, user_id: &str) -> Result<RemovalReport> {
        let mut report = RemovalReport::default();

        match self.users.delete(user_id).await {
            Ok(()) => report.deleted_from.push("users".to_string()),
            Err(err) => report.warnings.push(format!("users: {err}")),
        }

        match self.auth.delete_identity(user_id).await {
            Ok(()) => report.deleted_from.push("auth".to_string()),
            Err(err) => report.warnings.push(format!("auth: {err}")),
        }

        // Active session and key mapping, if any. The mutex is held across
        // the session delete so cleanup cannot race a concurrent login.
        let mut map = self.key_map.lock().await;
        let stale: Vec<(String, String)> = map
            .entries()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| (entry.key.clone(), entry.session_id.clone()))
            .collect();

        for (key, session_id) in stale {
            match self.sessions.delete(&session_id).await {
                Ok(()) => report.deleted_from.push("sessions".to_string()),
                Err(err) => report.warnings.push(format!("sessions: {err}")),
            }
            match map.remove(&key) {
                Ok(_) => report.deleted_from.push("keymap".to_string()),
                Err(err) => report.warnings.push(format!("keymap: {err}")),
            }
        }
        drop(map);

        for warning in &report.warnings {
            warn!(user_id, warning, "partial cleanup during user removal");
        }
        debug!(user_id, deleted_from = ?report.deleted_from, "user removed");
        Ok(report)
    }

    /// Check a user's presence in the credential and user-record stores
    /// independently.
    ///
    /// Reports `verified` only when both stores know the user. When exactly
    /// one does, the report carries an explicit consistency warning — a data
    /// drift detector, not a failure.
    pub async fn verify_user(&self, user_id: &str) -> Result<VerifyReport> {
        let in_auth = self.auth.identity_exists(user_id).await?;
        let in_users = match self.users.get(user_id).await {
            Ok(_) => true,
            Err(err) if err.is_not_found() => false,
            Err(err) => return Err(err),
        };

        let mut report = VerifyReport {
            verified: in_auth && in_users,
            warnings: Vec::new(),
        };

        if in_auth != in_users {
            let warning = format!(
                "identity stores disagree for '{user_id}': auth={in_auth}, users={in_users}"
            );
            warn!(user_id, in_auth, in_users, "identity store drift");
            report.warnings.push(warning);
        }

        Ok(report)
    }

    /// Update a user's profile record.
    ///
    /// The patch passes the profile-update filter, so identity and credential
    /// fields never reach the user store through this path.
    pub async fn update_user_data(&self, user_id: &str, patch: Record) -> Result<()> {
        let patch = filters::PROFILE_UPDATE.apply(&patch)?;
        self.users.update(user_id, patch).await
    }

    /// Fetch a user's profile record.
    pub async fn get_user_data(&self, user_id: &str) -> Result<Record> {
        self.users.get(user_id).await
    }

    /// List user ids, optionally restricted by a field-equality filter.
    pub async fn list_users(&self, filter: Option<&Record>) -> Result<Vec<String>> {
        self.users.list(filter).await
    }

    /// Verify a password without creating a session.
    pub async fn verify_password(&self, user_id: &str, password: &str) -> Result<()> {
        self.auth.check_password(user_id, password).await
    }

    /// Replace a user's password.
    pub async fn reset_password(&self, user_id: &str, password: &str) -> Result<()> {
        self.auth.set_password(user_id, password).await
    }

    fn session_opts(&self, timeout: Option<Duration>) -> SessionOptions {
        SessionOptions {
            timeout: timeout.unwrap_or_else(|| self.config.session_timeout()),
        }
    }
}

impl std::fmt::Debug for Desk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desk")
            .field("root", &self.config.root())
            .finish()
    }
}
