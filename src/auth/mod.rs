//! Authentication
//!
//! Handles:
//! - Signup/login/logout routes
//! - Session tokens and the session cookie
//! - Password hashing
//! - The current-user extractor

mod middleware;
pub mod password;
mod routes;
pub mod session;

pub use middleware::CurrentUser;
pub use routes::auth_router;
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
