//! Guest-to-user conversion: session data carried over, guest artifacts
//! discarded.

use serde_json::json;

use crate::helpers::{record, signup, test_desk};

#[tokio::test]
async fn conversion_carries_session_data_and_discards_the_guest() {
    let t = test_desk().await;

    let mut guest = t.desk.checkin_guest(None).await.unwrap();
    guest
        .update_session_data(record(&[("cart", json!(["x"]))]))
        .await
        .unwrap();
    let guest_key = guest.user_key().to_string();
    let guest_sid = guest.session_id().unwrap().to_string();

    let handle = t
        .desk
        .login_guest(signup("alice", "Alice", "p1"), &guest_key)
        .await
        .unwrap();

    assert!(handle.is_logged_in());
    assert_eq!(handle.user_id(), "alice");
    assert_ne!(handle.user_key(), guest_key);
    assert_ne!(handle.session_id().unwrap(), guest_sid);

    // Guest data rode along into the new session.
    let data = handle.session_data().unwrap();
    assert_eq!(data["cart"], json!(["x"]));

    // Guest session and mapping are gone.
    use concierge::backend::SessionStore;
    assert!(t.sessions.get(&guest_sid).await.is_err());
    let err = t.desk.restore_user(&guest_key).await.unwrap_err();
    assert!(err.is_not_found());

    // The account itself was fully registered.
    let report = t.desk.verify_user("alice").await.unwrap();
    assert!(report.verified);
}

#[tokio::test]
async fn conversion_with_empty_session_data_still_works() {
    let t = test_desk().await;

    let guest = t.desk.checkin_guest(None).await.unwrap();
    let handle = t
        .desk
        .login_guest(signup("bob", "Bob", "p2"), guest.user_key())
        .await
        .unwrap();

    assert!(handle.is_logged_in());
    assert_eq!(handle.session_data().unwrap().len(), 0);
}

#[tokio::test]
async fn conversion_fails_on_unknown_guest_key() {
    let t = test_desk().await;

    let err = t
        .desk
        .login_guest(signup("alice", "Alice", "p1"), "no-such-key")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Nothing was registered.
    assert!(t.desk.get_user_data("alice").await.is_err());
}

#[tokio::test]
async fn conversion_leaves_guest_intact_when_registration_fails() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();

    let mut guest = t.desk.checkin_guest(None).await.unwrap();
    guest
        .update_session_data(record(&[("cart", json!(["x"]))]))
        .await
        .unwrap();

    // "alice" already exists, so registration fails mid-conversion.
    let err = t
        .desk
        .login_guest(signup("alice", "Alice", "p1"), guest.user_key())
        .await
        .unwrap_err();
    assert!(!err.is_validation());

    // The guest can carry on: session and mapping survived.
    let restored = t.desk.restore_user(guest.user_key()).await.unwrap();
    assert!(restored.is_guest());
    assert_eq!(restored.session_data().unwrap()["cart"], json!(["x"]));
}
