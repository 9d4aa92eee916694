//! E2E tests for health check and metrics endpoints

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::new().await;

    // Signing up generates traffic and a session
    let alice = server.signup("alice").await;

    let response = alice
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/does-not-exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
