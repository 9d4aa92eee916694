//! E2E tests for profiles, follows, suggestions and profile updates

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_follow_toggle_keeps_both_sides_in_sync() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let url = server.url(&format!("/api/users/follow/{}", bob.id));

    let followed: Value = alice
        .client
        .post(&url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(followed["following"], true);
    assert_eq!(followed["message"], "User followed successfully");

    let alice_profile = server.get_json(&bob, "/api/users/profile/alice").await;
    assert_eq!(alice_profile["following"], json!([bob.id]));
    let bob_profile = server.get_json(&alice, "/api/users/profile/bob").await;
    assert_eq!(bob_profile["followers"], json!([alice.id]));

    let unfollowed: Value = alice
        .client
        .post(&url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unfollowed["following"], false);

    let alice_profile = server.get_json(&bob, "/api/users/profile/alice").await;
    assert_eq!(alice_profile["following"], json!([]));
    let bob_profile = server.get_json(&alice, "/api/users/profile/bob").await;
    assert_eq!(bob_profile["followers"], json!([]));
}

#[tokio::test]
async fn test_follow_self_and_missing_account() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;

    let own = alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", alice.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), 400);

    let missing = alice
        .client
        .post(server.url("/api/users/follow/01HZZZZZZZZZZZZZZZZZZZZZZZ"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_following_feed_tracks_follows() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let carol = server.signup("carol").await;

    server.create_post(&bob, "from bob").await;
    server.create_post(&carol, "from carol").await;

    let empty = server.get_json(&alice, "/api/posts/following").await;
    assert!(empty.as_array().unwrap().is_empty());

    alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", bob.id)))
        .send()
        .await
        .unwrap();

    let feed = server.get_json(&alice, "/api/posts/following").await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["text"], "from bob");
}

#[tokio::test]
async fn test_suggested_accounts_exclude_self_and_followed() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let carol = server.signup("carol").await;

    alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", bob.id)))
        .send()
        .await
        .unwrap();

    let suggested = server.get_json(&alice, "/api/users/suggested").await;
    let ids: Vec<&str> = suggested
        .as_array()
        .unwrap()
        .iter()
        .map(|account| account["_id"].as_str().unwrap())
        .collect();

    assert!(ids.len() <= 4);
    assert!(!ids.contains(&alice.id.as_str()));
    assert!(!ids.contains(&bob.id.as_str()));
    assert_eq!(ids, vec![carol.id.as_str()]);
}

#[tokio::test]
async fn test_profile_lookup() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;

    let profile = server.get_json(&alice, "/api/users/profile/alice").await;
    assert_eq!(profile["_id"], alice.id.as_str());
    assert!(profile.get("password").is_none());

    let missing = alice
        .client
        .get(server.url("/api/users/profile/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_update_profile() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    server.signup("bob").await;
    let url = server.url("/api/users/update");

    let taken = alice
        .client
        .post(&url)
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status(), 400);

    let half_password = alice
        .client
        .post(&url)
        .json(&json!({ "newPassword": "another-secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(half_password.status(), 400);

    let updated: Value = alice
        .client
        .post(&url)
        .json(&json!({
            "fullName": "Alice Liddell",
            "bio": "down the rabbit hole",
            "currentPassword": "password123",
            "newPassword": "another-secret",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["fullName"], "Alice Liddell");
    assert_eq!(updated["bio"], "down the rabbit hole");

    let login = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": "alice", "password": "another-secret"}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
}
