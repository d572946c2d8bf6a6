//! Participation lifecycle: visitor admission, guest check-in, login,
//! restore, logout, and the key-map synchronization pass.

use std::time::Duration;

use serde_json::json;

use crate::helpers::{credentials, record, signup, test_desk};

#[tokio::test]
async fn visitor_admission_is_storage_free() {
    let t = test_desk().await;

    let handle = t.desk.admit_visitor();
    assert!(handle.is_visitor());
    assert_eq!(handle.session_id(), None);

    // Nothing to restore: the key was never mapped.
    let err = t.desk.restore_user(handle.user_key()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn guest_checkin_and_restore_round_trip() {
    let t = test_desk().await;

    let guest = t.desk.checkin_guest(None).await.unwrap();
    assert!(guest.is_guest());
    assert!(guest.session_id().is_some());

    let restored = t.desk.restore_user(guest.user_key()).await.unwrap();
    assert!(restored.is_guest());
    assert_eq!(restored.user_id(), guest.user_id());
    assert_eq!(restored.user_key(), guest.user_key());
    assert_eq!(restored.session_id(), guest.session_id());
}

#[tokio::test]
async fn login_and_restore_round_trip() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    let handle = t
        .desk
        .login_user(credentials("alice", "p1"), None)
        .await
        .unwrap();
    assert!(handle.is_logged_in());
    assert_eq!(handle.user_field("moniker"), Some(&json!("Alice")));
    // Credentials never reach the user record.
    assert_eq!(handle.user_field("password"), None);

    let restored = t.desk.restore_user(handle.user_key()).await.unwrap();
    assert!(restored.is_logged_in());
    assert_eq!(restored.user_id(), "alice");
    assert_eq!(restored.user_key(), handle.user_key());
    assert_eq!(restored.session_id(), handle.session_id());
    assert_eq!(restored.user_field("moniker"), Some(&json!("Alice")));
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    let err = t
        .desk
        .login_user(credentials("alice", "wrong"), None)
        .await
        .unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn login_rejects_unknown_user_before_touching_auth() {
    let t = test_desk().await;

    let err = t
        .desk
        .login_user(credentials("nobody", "p1"), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn relogin_invalidates_the_previous_session() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    let first = t
        .desk
        .login_user(credentials("alice", "p1"), None)
        .await
        .unwrap();
    let first_sid = first.session_id().unwrap().to_string();

    let second = t
        .desk
        .login_user(credentials("alice", "p1"), None)
        .await
        .unwrap();
    assert_ne!(second.session_id().unwrap(), first_sid);

    // The old session is gone from the store, so the old key no longer
    // restores; its mapping is pruned as a side effect.
    let err = t.desk.restore_user(first.user_key()).await.unwrap_err();
    assert!(err.is_expired());
    let err = t.desk.restore_user(first.user_key()).await.unwrap_err();
    assert!(err.is_not_found());

    // The new key still works.
    assert!(t.desk.restore_user(second.user_key()).await.is_ok());
}

#[tokio::test]
async fn restore_of_expired_session_removes_the_mapping() {
    let t = test_desk().await;

    let guest = t
        .desk
        .checkin_guest(Some(Duration::from_secs(60)))
        .await
        .unwrap();

    t.clock.advance(61_000);

    let err = t.desk.restore_user(guest.user_key()).await.unwrap_err();
    assert!(err.is_expired());

    // The stale mapping was removed: the second attempt is a plain miss.
    let err = t.desk.restore_user(guest.user_key()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_expired());
}

#[tokio::test]
async fn session_data_merges_across_updates() {
    let t = test_desk().await;

    let mut guest = t.desk.checkin_guest(None).await.unwrap();
    guest
        .update_session_data(record(&[("a", json!(1))]))
        .await
        .unwrap();
    guest
        .update_session_data(record(&[("b", json!(2))]))
        .await
        .unwrap();

    // Both updates survive, and a restored handle sees them too.
    let restored = t.desk.restore_user(guest.user_key()).await.unwrap();
    let data = restored.session_data().unwrap();
    assert_eq!(data["a"], json!(1));
    assert_eq!(data["b"], json!(2));
    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn logout_deletes_session_and_mapping() {
    let t = test_desk().await;

    let guest = t.desk.checkin_guest(None).await.unwrap();
    let sid = guest.session_id().unwrap().to_string();

    t.desk.logout_user(&sid).await.unwrap();

    let err = t.desk.restore_user(guest.user_key()).await.unwrap_err();
    assert!(err.is_not_found());

    // A second logout on the same session fails the existence check.
    let err = t.desk.logout_user(&sid).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn synchronize_prunes_only_expired_mappings() {
    let t = test_desk().await;

    let long_lived = t
        .desk
        .checkin_guest(Some(Duration::from_secs(10_000)))
        .await
        .unwrap();
    let short_lived = t
        .desk
        .checkin_guest(Some(Duration::from_secs(60)))
        .await
        .unwrap();

    t.clock.advance(61_000);
    let pruned = t.desk.synchronize().await.unwrap();
    assert_eq!(pruned, 1);

    assert!(t.desk.restore_user(long_lived.user_key()).await.is_ok());
    let err = t
        .desk
        .restore_user(short_lived.user_key())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn login_rejects_incomplete_credentials() {
    let t = test_desk().await;

    let err = t
        .desk
        .login_user(record(&[("user_id", json!("alice"))]), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = t
        .desk
        .login_user(record(&[("user_id", json!("")), ("password", json!("p"))]), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
