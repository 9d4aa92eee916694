//! API layer
//!
//! HTTP handlers for:
//! - Auth (signup, login, logout, current user)
//! - Users (profiles, suggestions, follow, profile edits)
//! - Posts (feeds, create, like, comment, delete)
//! - Notifications
//! - Metrics (Prometheus)

mod converters;
mod dto;
pub mod metrics;
mod notifications;
mod posts;
mod users;

use axum::Router;

pub use converters::*;
pub use dto::*;

pub use metrics::{metrics_router, track_http_metrics};
pub use notifications::notifications_router;
pub use posts::posts_router;
pub use users::users_router;

use crate::AppState;

/// Create the `/api` router
///
/// Every route except signup and login requires a session.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", crate::auth::auth_router())
        .nest("/users", users_router())
        .nest("/posts", posts_router())
        .nest("/notifications", notifications_router())
}
