//! Error types for Flock
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Precondition failures (`NotFound`, `Validation`, `InvalidOperation`,
/// `Unauthorized`) are raised before any mutation happens.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced account, post or notification does not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or malformed input (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request is well-formed but not allowed, e.g. following yourself (400)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Missing session, bad credentials, or acting on someone else's post (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn account_not_found() -> Self {
        AppError::NotFound("User not found".to_string())
    }

    pub fn post_not_found() -> Self {
        AppError::NotFound("Post not found".to_string())
    }

    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("Unauthorized: No Token Provided".to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::InvalidOperation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "invalid_operation")
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), "unauthorized"),
            AppError::Database(error) => {
                tracing::error!(%error, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    "database",
                )
            }
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "storage"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Internal(error) => {
                tracing::error!(%error, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "internal",
                )
            }
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_map_to_client_statuses() {
        let cases = [
            (AppError::post_not_found(), StatusCode::NOT_FOUND),
            (
                AppError::Validation("Text field is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::InvalidOperation("You can't follow/unfollow yourself".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::unauthenticated(), StatusCode::UNAUTHORIZED),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
