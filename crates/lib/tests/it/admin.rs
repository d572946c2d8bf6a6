//! Account administration: add, remove, verify, password management, and
//! profile queries.

use serde_json::json;

use crate::helpers::{credentials, record, signup, test_desk};

#[tokio::test]
async fn duplicate_registration_leaves_the_first_account_untouched() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    let err = t
        .desk
        .add_user(signup("alice", "Impostor", "p2"))
        .await
        .unwrap_err();
    assert!(!err.is_validation());

    let stored = t.desk.get_user_data("alice").await.unwrap();
    assert_eq!(stored["moniker"], json!("Alice"));
    assert!(t.desk.verify_password("alice", "p1").await.is_ok());
    assert!(t.desk.verify_password("alice", "p2").await.is_err());
}

#[tokio::test]
async fn remove_user_cleans_every_store() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    let handle = t
        .desk
        .login_user(credentials("alice", "p1"), None)
        .await
        .unwrap();

    let report = t.desk.remove_user("alice").await.unwrap();
    assert!(report.warnings.is_empty());
    for store in ["users", "auth", "sessions", "keymap"] {
        assert!(
            report.deleted_from.iter().any(|s| s == store),
            "missing {store} in {:?}",
            report.deleted_from
        );
    }

    let report = t.desk.verify_user("alice").await.unwrap();
    assert!(!report.verified);
    assert!(report.warnings.is_empty());

    let err = t.desk.restore_user(handle.user_key()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn remove_user_reports_partial_cleanup() {
    let t = test_desk().await;

    // Never registered anywhere: every store reports a miss, the call
    // still succeeds.
    let report = t.desk.remove_user("ghost").await.unwrap();
    assert!(report.deleted_from.is_empty());
    assert!(!report.warnings.is_empty());
}

#[tokio::test]
async fn verify_user_flags_store_drift() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();

    // Mutate one store behind the desk's back.
    use concierge::backend::UserStore;
    t.users.delete("alice").await.unwrap();

    let report = t.desk.verify_user("alice").await.unwrap();
    assert!(!report.verified);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("alice"));
}

#[tokio::test]
async fn reset_password_replaces_the_credential() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    t.desk.reset_password("alice", "p2").await.unwrap();

    assert!(t.desk.verify_password("alice", "p1").await.is_err());
    assert!(t.desk.verify_password("alice", "p2").await.is_ok());
    assert!(
        t.desk
            .login_user(credentials("alice", "p2"), None)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn list_users_supports_field_equality_filters() {
    let t = test_desk().await;

    let mut rec = signup("alice", "Alice", "p1");
    rec.insert("team".to_string(), json!("red"));
    t.desk.add_user(rec).await.unwrap();

    let mut rec = signup("bob", "Bob", "p2");
    rec.insert("team".to_string(), json!("blue"));
    t.desk.add_user(rec).await.unwrap();

    let all = t.desk.list_users(None).await.unwrap();
    assert_eq!(all, vec!["alice".to_string(), "bob".to_string()]);

    let reds = t
        .desk
        .list_users(Some(&record(&[("team", json!("red"))])))
        .await
        .unwrap();
    assert_eq!(reds, vec!["alice".to_string()]);

    let none = t
        .desk
        .list_users(Some(&record(&[("team", json!("green"))])))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn update_user_data_is_visible_to_later_logins() {
    let t = test_desk().await;

    t.desk.add_user(signup("alice", "Alice", "p1")).await.unwrap();
    t.desk
        .update_user_data("alice", record(&[("moniker", json!("Alicia"))]))
        .await
        .unwrap();

    let handle = t
        .desk
        .login_user(credentials("alice", "p1"), None)
        .await
        .unwrap();
    assert_eq!(handle.user_field("moniker"), Some(&json!("Alicia")));
}
