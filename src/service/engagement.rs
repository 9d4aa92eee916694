//! Graph and engagement service
//!
//! Follow/unfollow, like/unlike, comments, and post creation/deletion.
//! Each relationship toggle is one database transaction; notifications and
//! media calls happen afterwards and never fail the operation.

use std::sync::Arc;

use chrono::Utc;

use super::feed::{PostView, hydrate_posts};
use super::notification::NotificationSink;
use crate::data::{
    AccountId, Comment, Database, EntityId, Notification, NotificationType, Post, PostId,
};
use crate::error::AppError;
use crate::metrics::{GRAPH_TOGGLES_TOTAL, NOTIFICATIONS_TOTAL};
use crate::storage::{self, MediaStore};

/// Relationship state after a follow toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    Followed,
    Unfollowed,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Graph and engagement service
pub struct EngagementService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
    notifications: Arc<dyn NotificationSink>,
}

impl EngagementService {
    /// Create new engagement service
    pub fn new(
        db: Arc<Database>,
        media: Arc<dyn MediaStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            media,
            notifications,
        }
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Follow `target` if `actor` does not follow it yet, otherwise unfollow
    ///
    /// # Errors
    /// - `InvalidOperation` when `actor == target`
    /// - `NotFound` when either account is missing
    ///
    /// # Side Effects
    /// A `follow` notification for `target` on the follow transition
    pub async fn follow_unfollow(
        &self,
        actor: &AccountId,
        target: &AccountId,
    ) -> Result<FollowState, AppError> {
        if actor == target {
            return Err(AppError::InvalidOperation(
                "You can't follow/unfollow yourself".to_string(),
            ));
        }

        for id in [actor, target] {
            self.db
                .get_account(id)
                .await?
                .ok_or_else(AppError::account_not_found)?;
        }

        let followed = self.db.toggle_follow(actor, target).await?;

        let state = if followed {
            self.notify(Notification::new(
                actor.clone(),
                target.clone(),
                NotificationType::Follow,
            ))
            .await;
            FollowState::Followed
        } else {
            FollowState::Unfollowed
        };

        GRAPH_TOGGLES_TOTAL
            .with_label_values(&["follow", if followed { "on" } else { "off" }])
            .inc();
        tracing::info!(actor = %actor, target = %target, state = ?state, "Follow toggled");

        Ok(state)
    }

    // =========================================================================
    // Likes & comments
    // =========================================================================

    /// Like the post if `actor` has not liked it yet, otherwise unlike
    ///
    /// # Returns
    /// The post with recomputed likes
    ///
    /// # Side Effects
    /// A `like` notification for the post author on the like transition only
    pub async fn like_unlike(
        &self,
        actor: &AccountId,
        post_id: &PostId,
    ) -> Result<PostView, AppError> {
        let post = self.require_post(post_id).await?;

        let liked = self.db.toggle_like(post_id, actor).await?;
        if liked {
            self.notify(Notification::new(
                actor.clone(),
                post.author_id.clone(),
                NotificationType::Like,
            ))
            .await;
        }

        GRAPH_TOGGLES_TOTAL
            .with_label_values(&["like", if liked { "on" } else { "off" }])
            .inc();
        tracing::info!(actor = %actor, post_id = %post_id, liked, "Like toggled");

        self.view(post).await
    }

    /// Append a comment to the end of the post's comments
    ///
    /// # Errors
    /// - `Validation` when `text` is empty
    /// - `NotFound` when the post is missing
    pub async fn comment(
        &self,
        actor: &AccountId,
        post_id: &PostId,
        text: &str,
    ) -> Result<PostView, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Text field is required".to_string()));
        }

        let post = self.require_post(post_id).await?;

        self.db
            .insert_comment(&Comment {
                id: EntityId::new(),
                post_id: post.id.clone(),
                author_id: actor.clone(),
                text: text.to_string(),
                created_at: Utc::now(),
            })
            .await?;

        tracing::debug!(actor = %actor, post_id = %post_id, "Comment added");
        self.view(post).await
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Create a post with text, an image payload, or both
    ///
    /// The image goes through the media store; if that fails the raw payload
    /// is kept as the reference.
    ///
    /// # Errors
    /// - `Validation` when neither text nor image is given
    /// - `NotFound` when the author is missing
    pub async fn create_post(
        &self,
        author: &AccountId,
        text: Option<String>,
        image: Option<String>,
    ) -> Result<PostView, AppError> {
        let text = non_empty(text);
        let image = non_empty(image);
        if text.is_none() && image.is_none() {
            return Err(AppError::Validation(
                "Post must have text or image".to_string(),
            ));
        }

        self.db
            .get_account(author)
            .await?
            .ok_or_else(AppError::account_not_found)?;

        let image = match image {
            Some(payload) => Some(
                storage::store_or_fallback(self.media.as_ref(), &payload)
                    .await
                    .reference,
            ),
            None => None,
        };

        let now = Utc::now();
        let post = Post {
            id: PostId::new(),
            author_id: author.clone(),
            text,
            image,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_post(&post).await?;

        tracing::info!(author = %author, post_id = %post.id, "Post created");
        self.view(post).await
    }

    /// Delete a post owned by `actor`
    ///
    /// Likes and comments go with it. Image cleanup is best-effort.
    ///
    /// # Errors
    /// - `NotFound` when the post is missing
    /// - `Unauthorized` when `actor` is not the author
    pub async fn delete_post(&self, actor: &AccountId, post_id: &PostId) -> Result<(), AppError> {
        let post = self.require_post(post_id).await?;

        if &post.author_id != actor {
            return Err(AppError::Unauthorized(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        if let Some(image) = &post.image {
            storage::discard_best_effort(self.media.as_ref(), image).await;
        }

        self.db.delete_post(post_id).await?;
        tracing::info!(actor = %actor, post_id = %post_id, "Post deleted");

        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_post(&self, post_id: &PostId) -> Result<Post, AppError> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)
    }

    async fn view(&self, post: Post) -> Result<PostView, AppError> {
        hydrate_posts(&self.db, vec![post])
            .await?
            .pop()
            .ok_or_else(AppError::post_not_found)
    }

    async fn notify(&self, notification: Notification) {
        let kind = notification.notification_type.clone();
        match self.notifications.record(notification).await {
            Ok(()) => {
                NOTIFICATIONS_TOTAL.with_label_values(&[kind.as_str(), "ok"]).inc();
            }
            Err(error) => {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "failed"])
                    .inc();
                tracing::warn!(%error, notification_type = %kind, "Failed to record notification");
            }
        }
    }
}
