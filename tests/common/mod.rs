//! Common test utilities for E2E tests

#![allow(dead_code)]

use flock::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A signed-up account with its own cookie-carrying client
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub client: reqwest::Client,
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration; media storage stays disabled
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            media: config::MediaStorageConfig::default(),
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 1_296_000,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = flock::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client: build_client(),
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up a new account; the returned client carries its session cookie
    pub async fn signup(&self, username: &str) -> TestUser {
        let client = build_client();
        let response = client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "fullName": format!("{} Test", username),
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "password123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "signup failed for {}", username);

        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["_id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            client,
        }
    }

    /// Create a text post as `user` and return its JSON
    pub async fn create_post(&self, user: &TestUser, text: &str) -> Value {
        let response = user
            .client
            .post(self.url("/api/posts/create"))
            .json(&json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// GET `path` as `user`, asserting 200, and return the JSON body
    pub async fn get_json(&self, user: &TestUser, path: &str) -> Value {
        let response = user.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 200, "GET {} failed", path);
        response.json().await.unwrap()
    }
}
