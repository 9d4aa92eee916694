//! Conversion functions from service views to API DTOs

use crate::api::dto::*;
use crate::data::PublicAccount;
use crate::service::{CommentView, NotificationView, PostView, Profile, ProfileUpdate};

/// Convert a public account to AccountResponse, without relationship lists
pub fn account_to_response(account: &PublicAccount) -> AccountResponse {
    AccountResponse {
        id: account.id.clone(),
        username: account.username.clone(),
        email: account.email.clone(),
        full_name: account.full_name.clone(),
        bio: account.bio.clone().unwrap_or_default(),
        link: account.link.clone().unwrap_or_default(),
        profile_img: account.profile_image.clone().unwrap_or_default(),
        cover_img: account.cover_image.clone().unwrap_or_default(),
        followers: None,
        following: None,
        liked_posts: None,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

/// Convert a profile to AccountResponse with relationship lists
pub fn profile_to_response(profile: &Profile) -> AccountResponse {
    AccountResponse {
        followers: Some(profile.relationships.followers.clone()),
        following: Some(profile.relationships.following.clone()),
        liked_posts: Some(profile.relationships.liked_posts.clone()),
        ..account_to_response(&profile.account)
    }
}

fn comment_to_response(comment: &CommentView) -> CommentResponse {
    CommentResponse {
        id: comment.id.clone(),
        text: comment.text.clone(),
        user: account_to_response(&comment.author),
        created_at: comment.created_at,
    }
}

/// Convert PostView to PostResponse
pub fn post_to_response(post: &PostView) -> PostResponse {
    PostResponse {
        id: post.id.clone(),
        user: account_to_response(&post.author),
        text: post.text.clone(),
        img: post.image.clone(),
        likes: post.likes.clone(),
        comments: post.comments.iter().map(comment_to_response).collect(),
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub fn posts_to_response(posts: &[PostView]) -> Vec<PostResponse> {
    posts.iter().map(post_to_response).collect()
}

/// Convert NotificationView to NotificationResponse
pub fn notification_to_response(notification: &NotificationView) -> NotificationResponse {
    NotificationResponse {
        id: notification.id.clone(),
        from: account_to_response(&notification.from),
        to: notification.to.clone(),
        notification_type: notification.notification_type.clone(),
        read: notification.read,
        created_at: notification.created_at,
    }
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            full_name: req.full_name,
            email: req.email,
            username: req.username,
            current_password: req.current_password,
            new_password: req.new_password,
            bio: req.bio,
            link: req.link,
            profile_image: req.profile_img,
            cover_image: req.cover_img,
        }
    }
}
