//! API request and response DTOs
//!
//! Field names follow the JSON shape the web client expects
//! (`_id`, `fullName`, `profileImg`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{AccountId, EntityId, PostId};

// =============================================================================
// Responses
// =============================================================================

/// Account response
///
/// Never carries the password hash. Relationship lists are present only
/// where the full profile is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(rename = "_id")]
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub link: String,
    pub profile_img: String,
    pub cover_img: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<AccountId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<Vec<AccountId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_posts: Option<Vec<PostId>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub text: String,
    pub user: AccountResponse,
    pub created_at: DateTime<Utc>,
}

/// Post response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: PostId,
    pub user: AccountResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    pub likes: Vec<AccountId>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub from: AccountResponse,
    pub to: AccountId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Follow toggle response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub message: String,
    pub following: bool,
}

/// Unread notification count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// POST /api/auth/signup
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/posts/create
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostRequest {
    pub text: Option<String>,
    pub img: Option<String>,
}

/// POST /api/posts/comment/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

/// POST /api/users/update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub bio: Option<String>,
    pub link: Option<String>,
    pub profile_img: Option<String>,
    pub cover_img: Option<String>,
}
