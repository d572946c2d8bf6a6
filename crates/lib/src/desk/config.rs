//! Desk configuration
//!
//! A desk is a storage location holding the configuration and data for one
//! orchestrator instance. The configuration is loaded once when the desk is
//! opened and is immutable for the life of the instance.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Name of the optional config file inside a desk root.
pub const CONFIG_FILE: &str = "desk.json";

/// Name of the key-map snapshot file inside a desk root.
pub const KEY_MAP_FILE: &str = "user_keys.json";

/// Default session lifetime applied when a lifecycle call does not pass one.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

/// Configuration for one desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// The desk storage location. Must exist before the desk is opened.
    root: PathBuf,
    /// Default session lifetime in seconds.
    #[serde(default = "default_timeout_secs")]
    session_timeout_secs: u64,
    /// Key-map snapshot filename, relative to the root.
    #[serde(default = "default_key_map_file")]
    key_map_file: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

fn default_key_map_file() -> String {
    KEY_MAP_FILE.to_string()
}

/// The on-disk shape of `desk.json`: everything but the root, which is where
/// the file itself was found.
#[derive(Debug, Deserialize)]
struct DeskConfigFile {
    #[serde(default = "default_timeout_secs")]
    session_timeout_secs: u64,
    #[serde(default = "default_key_map_file")]
    key_map_file: String,
}

impl DeskConfig {
    /// Configuration with defaults for the given storage location.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            key_map_file: KEY_MAP_FILE.to_string(),
        }
    }

    /// Load configuration from `desk.json` under the given root.
    ///
    /// A missing config file yields the defaults; the root itself is not
    /// required to exist until [`Desk::open`](crate::Desk::open).
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(json) => {
                let file: DeskConfigFile = serde_json::from_str(&json)?;
                Ok(Self {
                    root,
                    session_timeout_secs: file.session_timeout_secs,
                    key_map_file: file.key_map_file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(root)),
            Err(err) => Err(err.into()),
        }
    }

    /// Override the default session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout_secs = timeout.as_secs();
        self
    }

    /// The desk storage location.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default session lifetime.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Absolute path of the key-map snapshot file.
    pub fn key_map_path(&self) -> PathBuf {
        self.root.join(&self.key_map_file)
    }
}
