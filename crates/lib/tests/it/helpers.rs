use std::sync::Arc;

use concierge::{
    Desk, DeskConfig, FixedClock, Record,
    backend::{MemoryAuth, MemorySessions, MemoryUsers},
};
use serde_json::{Value, json};

/// A desk over in-memory backends with a controllable clock.
pub struct TestDesk {
    pub desk: Desk,
    pub sessions: Arc<MemorySessions>,
    pub users: Arc<MemoryUsers>,
    pub clock: Arc<FixedClock>,
    _dir: tempfile::TempDir,
}

pub async fn test_desk() -> TestDesk {
    let dir = tempfile::tempdir().expect("Failed to create desk root");
    let clock = Arc::new(FixedClock::new(0));
    let sessions = Arc::new(MemorySessions::with_clock(clock.clone()));
    let users = Arc::new(MemoryUsers::new());

    let desk = Desk::open(
        DeskConfig::new(dir.path()),
        Arc::new(MemoryAuth::new()),
        sessions.clone(),
        users.clone(),
    )
    .await
    .expect("Failed to open test desk");

    TestDesk {
        desk,
        sessions,
        users,
        clock,
        _dir: dir,
    }
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Credential record for login calls.
pub fn credentials(user_id: &str, password: &str) -> Record {
    record(&[("user_id", json!(user_id)), ("password", json!(password))])
}

/// Full signup record for add_user / login_guest calls.
pub fn signup(user_id: &str, moniker: &str, password: &str) -> Record {
    record(&[
        ("user_id", json!(user_id)),
        ("moniker", json!(moniker)),
        ("password", json!(password)),
    ])
}
