//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Defines a ULID-backed identifier newtype.
///
/// Identifiers are compared by value, so an id read from the database and
/// one parsed from a request path are equal whenever their strings are.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new ULID
            pub fn new() -> Self {
                Self(ulid::Ulid::new().to_string())
            }

            /// Create from existing string
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Account identifier (ULID format, 26 characters)
    AccountId
);

entity_id!(
    /// Post identifier (ULID format, 26 characters)
    PostId
);

entity_id!(
    /// Identifier for comments and notifications
    EntityId
);

// =============================================================================
// Account
// =============================================================================

/// A registered user
///
/// Relationship sets (`following`, `followers`, `liked_posts`) live in
/// edge tables and are loaded separately as [`Relationships`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password_hash: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub link: Option<String>,
    /// Media reference for the profile image
    pub profile_image: Option<String>,
    /// Media reference for the cover image
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account without its credential field
///
/// This is the only account shape handed to callers outside the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicAccount {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub link: Option<String>,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            bio: account.bio,
            link: account.link,
            profile_image: account.profile_image,
            cover_image: account.cover_image,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Both sides of an account's follow graph plus its liked posts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub following: Vec<AccountId>,
    pub followers: Vec<AccountId>,
    pub liked_posts: Vec<PostId>,
}

// =============================================================================
// Post
// =============================================================================

/// A post row
///
/// `likes` and `comments` are stored in `post_likes` and `comments`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub author_id: AccountId,
    pub text: Option<String>,
    /// Media reference (uploaded URL or the raw payload on fallback)
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment embedded in a post, ordered by insertion
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: EntityId,
    pub post_id: PostId,
    pub author_id: AccountId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A like edge between a post and an account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostLike {
    pub post_id: PostId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification for user interactions
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: EntityId,
    /// Who triggered this notification
    pub from_account_id: AccountId,
    /// Who receives it
    pub to_account_id: AccountId,
    /// Type: follow, like
    pub notification_type: String,
    /// Whether the recipient has seen this
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Follow,
    Like,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Like => "like",
        }
    }
}

impl Notification {
    /// Build an unread notification stamped with the current time.
    pub fn new(from: AccountId, to: AccountId, kind: NotificationType) -> Self {
        Self {
            id: EntityId::new(),
            from_account_id: from,
            to_account_id: to,
            notification_type: kind.as_str().to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_by_value() {
        let generated = AccountId::new();
        let parsed = AccountId::from_string(generated.to_string());
        assert_eq!(generated, parsed);
        assert_eq!(generated.as_str().len(), 26);
    }

    #[test]
    fn notification_new_is_unread() {
        let notification = Notification::new(
            AccountId::from_string("a"),
            AccountId::from_string("b"),
            NotificationType::Like,
        );
        assert_eq!(notification.notification_type, "like");
        assert!(!notification.read);
    }
}
