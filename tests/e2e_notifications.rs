//! E2E tests for the notification log

mod common;

use common::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_follow_and_like_notify_recipient() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let post = server.create_post(&bob, "hello").await;

    alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", bob.id)))
        .send()
        .await
        .unwrap();
    alice
        .client
        .post(server.url(&format!(
            "/api/posts/like/{}",
            post["_id"].as_str().unwrap()
        )))
        .send()
        .await
        .unwrap();

    let count = server
        .get_json(&bob, "/api/notifications/unread_count")
        .await;
    assert_eq!(count["count"], 2);

    let notifications = server.get_json(&bob, "/api/notifications").await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    let mut kinds: Vec<&str> = notifications
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    kinds.sort();
    assert_eq!(kinds, vec!["follow", "like"]);
    for notification in notifications {
        assert_eq!(notification["from"]["username"], "alice");
        assert_eq!(notification["to"], bob.id.as_str());
    }

    // Listing marks everything read
    let count = server
        .get_json(&bob, "/api/notifications/unread_count")
        .await;
    assert_eq!(count["count"], 0);

    let alice_inbox = server.get_json(&alice, "/api/notifications").await;
    assert!(alice_inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unfollow_and_unlike_do_not_notify() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let post = server.create_post(&bob, "hello").await;
    let follow_url = server.url(&format!("/api/users/follow/{}", bob.id));
    let like_url = server.url(&format!("/api/posts/like/{}", post["_id"].as_str().unwrap()));

    for url in [&follow_url, &follow_url, &like_url, &like_url] {
        alice.client.post(url.as_str()).send().await.unwrap();
    }

    let notifications = server.get_json(&bob, "/api/notifications").await;
    assert_eq!(notifications.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_single_notification() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;

    alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", bob.id)))
        .send()
        .await
        .unwrap();

    let notifications = server.get_json(&bob, "/api/notifications").await;
    let id = notifications[0]["_id"].as_str().unwrap().to_string();
    let url = server.url(&format!("/api/notifications/{}", id));

    let foreign = alice.client.delete(&url).send().await.unwrap();
    assert_eq!(foreign.status(), 401);

    let deleted = bob.client.delete(&url).send().await.unwrap();
    assert_eq!(deleted.status(), 200);

    let again = bob.client.delete(&url).send().await.unwrap();
    assert_eq!(again.status(), 404);
}

#[tokio::test]
async fn test_clear_notifications() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;

    alice
        .client
        .post(server.url(&format!("/api/users/follow/{}", bob.id)))
        .send()
        .await
        .unwrap();

    let response = bob
        .client
        .delete(server.url("/api/notifications"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Notifications deleted successfully");

    let notifications = server.get_json(&bob, "/api/notifications").await;
    assert!(notifications.as_array().unwrap().is_empty());
}
