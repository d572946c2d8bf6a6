//! Persisted mapping from opaque external tokens to internal identifiers
//!
//! Applications never see a `user_id` or `session_id`; they hold an
//! unguessable token (the user key) that the desk resolves through this map.
//! The map is persisted as a whole-file JSON snapshot per desk — every
//! mutating operation rewrites the full map. That is acceptable at
//! small-to-moderate scale; the desk serializes all mutations behind a single
//! mutex so concurrent logins and cleanup cannot lose updates to each other.
//!
//! Entries reference sessions that expire on their own schedule, so the map
//! is only eventually consistent with the session store. [`KeyMap::synchronize`]
//! restores the invariant: it is run at desk open, immediately after the
//! session store has purged its expired records and reported the survivors.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Length of generated user keys. Keys are sampled from the alphanumeric
/// alphabet, so 16 characters is comfortably past the unguessability floor.
pub const KEY_LENGTH: usize = 16;

/// Generate a new random user key.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// One mapping from an external token to the internal pair it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyEntry {
    /// The opaque external token handed to the application
    pub key: String,
    /// Internal user identifier (a generated guest id for guest sessions)
    pub user_id: String,
    /// The session this token currently resolves to
    pub session_id: String,
}

/// The key → `(user_id, session_id)` map for one desk.
///
/// Owned by the desk and mutated only while the desk's key-map mutex is held.
#[derive(Debug)]
pub struct KeyMap {
    entries: HashMap<String, UserKeyEntry>,
    path: PathBuf,
}

impl KeyMap {
    /// Load the map from its snapshot file.
    ///
    /// A missing snapshot file is not an error: it yields an empty map that
    /// will create the file on first persist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { entries, path })
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&UserKeyEntry> {
        self.entries.get(key)
    }

    /// Insert or overwrite an entry and persist the whole map.
    pub fn put(
        &mut self,
        key: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            UserKeyEntry {
                key,
                user_id: user_id.into(),
                session_id: session_id.into(),
            },
        );
        self.persist()
    }

    /// Delete an entry if present. Persists only if something was removed.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Linear scan for the first entry mapped to the given session.
    ///
    /// Used for logout-by-session and for locating a user's stale entry on
    /// account removal.
    pub fn find_by_session(&self, session_id: &str) -> Option<&UserKeyEntry> {
        self.entries
            .values()
            .find(|entry| entry.session_id == session_id)
    }

    /// Iterate over all entries.
    pub fn entries(&self) -> impl Iterator<Item = &UserKeyEntry> {
        self.entries.values()
    }

    /// Remove every entry whose session is not in the given live set.
    ///
    /// Persists iff at least one entry was removed. Returns the number of
    /// entries removed.
    pub fn synchronize(&mut self, active_session_ids: &HashSet<String>) -> Result<usize> {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| active_session_ids.contains(&entry.session_id));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the snapshot file this map persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole map to the snapshot file.
    ///
    /// The snapshot is written to a sibling temp file and renamed into place
    /// so a crash mid-write cannot leave a truncated map behind.
    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
