//! In-memory reference backends
//!
//! `HashMap`-backed implementations of the three collaborator contracts,
//! suitable for testing, development, or embedded hosts that handle
//! persistence externally. Each store provides its own internal consistency
//! with an `RwLock`; nothing here shares state with the desk beyond the trait
//! surface.
//!
//! `MemoryAuth` hashes passwords with Argon2id in PHC string format; the
//! plaintext is never retained.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use async_trait::async_trait;
use uuid::Uuid;

use super::{AuthStore, Session, SessionOptions, SessionStore, StoreError, UserStore};
use crate::{Record, Result, clock::Clock, clock::SystemClock};

/// In-memory credential backend storing Argon2id PHC hashes.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    hashes: RwLock<HashMap<String, String>>,
}

impl MemoryAuth {
    /// Create an empty credential store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryAuth {
    async fn check_password(&self, user_id: &str, password: &str) -> Result<()> {
        let stored = {
            let hashes = self.hashes.read().unwrap();
            hashes
                .get(user_id)
                .cloned()
                .ok_or_else(|| StoreError::IdentityNotFound {
                    user_id: user_id.to_string(),
                })?
        };

        let parsed = PasswordHash::new(&stored).map_err(|e| StoreError::Unavailable {
            reason: format!("stored hash unreadable: {e}"),
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| {
                StoreError::PasswordMismatch {
                    message: format!("invalid password for '{user_id}'"),
                }
                .into()
            })
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<()> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::Unavailable {
                reason: format!("password hashing failed: {e}"),
            })?
            .to_string();

        self.hashes
            .write()
            .unwrap()
            .insert(user_id.to_string(), hash);
        Ok(())
    }

    async fn delete_identity(&self, user_id: &str) -> Result<()> {
        if self.hashes.write().unwrap().remove(user_id).is_none() {
            return Err(StoreError::IdentityNotFound {
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn identity_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.hashes.read().unwrap().contains_key(user_id))
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    user_id: String,
    data: Record,
    expires_at: u64,
}

type SessionTable = Arc<RwLock<HashMap<String, StoredSession>>>;

/// In-memory session backend with clock-driven expiry.
///
/// Creating a session for a user deletes any session that user already had,
/// upholding the one-live-session-per-user contract of [`SessionStore`].
pub struct MemorySessions {
    sessions: SessionTable,
    clock: Arc<dyn Clock>,
}

impl MemorySessions {
    /// Create a session store running on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a session store with an injected time source.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }
}

impl Default for MemorySessions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn create(&self, user_id: &str, opts: SessionOptions) -> Result<Box<dyn Session>> {
        let now = self.clock.now_millis();
        let session_id = Uuid::new_v4().to_string();
        let stored = StoredSession {
            user_id: user_id.to_string(),
            data: Record::new(),
            expires_at: now + opts.timeout.as_millis() as u64,
        };

        {
            let mut sessions = self.sessions.write().unwrap();
            // One live session per user: replace any existing one.
            sessions.retain(|_, s| s.user_id != user_id);
            sessions.insert(session_id.clone(), stored.clone());
        }

        Ok(Box::new(MemorySession {
            id: session_id,
            user_id: stored.user_id,
            data: stored.data,
            expires_at: stored.expires_at,
            sessions: Arc::clone(&self.sessions),
            clock: Arc::clone(&self.clock),
        }))
    }

    async fn get(&self, session_id: &str) -> Result<Box<dyn Session>> {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().unwrap();
        let stored = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        if now >= stored.expires_at {
            sessions.remove(session_id);
            return Err(StoreError::SessionExpired {
                session_id: session_id.to_string(),
            }
            .into());
        }

        Ok(Box::new(MemorySession {
            id: session_id.to_string(),
            user_id: stored.user_id,
            data: stored.data,
            expires_at: stored.expires_at,
            sessions: Arc::clone(&self.sessions),
            clock: Arc::clone(&self.clock),
        }))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        if self
            .sessions
            .write()
            .unwrap()
            .remove(session_id)
            .is_none()
        {
            return Err(StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<HashSet<String>> {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().unwrap();
        sessions.retain(|_, s| now < s.expires_at);
        Ok(sessions.keys().cloned().collect())
    }
}

/// Session handle over the in-memory table.
#[derive(Debug)]
struct MemorySession {
    id: String,
    user_id: String,
    data: Record,
    expires_at: u64,
    sessions: SessionTable,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn data(&self) -> &Record {
        &self.data
    }

    fn set_data(&mut self, data: Record) {
        self.data = data;
    }

    fn is_active(&self) -> bool {
        !self.is_expired()
    }

    fn is_expired(&self) -> bool {
        self.clock.now_millis() >= self.expires_at
    }

    async fn save(&mut self) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        let stored = sessions
            .get_mut(&self.id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: self.id.clone(),
            })?;
        stored.data = self.data.clone();
        Ok(())
    }
}

/// In-memory user-record backend.
#[derive(Debug, Default)]
pub struct MemoryUsers {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryUsers {
    /// Create an empty user-record store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn register(&self, record: Record) -> Result<()> {
        let user_id = record
            .get("user_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StoreError::InvalidRecord {
                reason: "record has no string 'user_id'".to_string(),
            })?
            .to_string();

        let mut records = self.records.write().unwrap();
        if records.contains_key(&user_id) {
            return Err(StoreError::UserAlreadyExists { user_id }.into());
        }
        records.insert(user_id, record);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Record> {
        self.records
            .read()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::UserNotFound {
                    user_id: user_id.to_string(),
                }
                .into()
            })
    }

    async fn update(&self, user_id: &str, patch: Record) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound {
                user_id: user_id.to_string(),
            })?;
        record.extend(patch);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        if self.records.write().unwrap().remove(user_id).is_none() {
            return Err(StoreError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn list(&self, filter: Option<&Record>) -> Result<Vec<String>> {
        let records = self.records.read().unwrap();
        let mut ids: Vec<String> = records
            .iter()
            .filter(|(_, record)| match filter {
                Some(fields) => fields
                    .iter()
                    .all(|(name, value)| record.get(name) == Some(value)),
                None => true,
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
