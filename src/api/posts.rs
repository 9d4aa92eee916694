//! Post endpoints: feeds, creation, likes, comments, deletion

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::api::dto::{CommentRequest, CreatePostRequest, MessageResponse, PostResponse};
use crate::api::{post_to_response, posts_to_response};
use crate::auth::CurrentUser;
use crate::data::{AccountId, PostId};
use crate::error::AppError;
use crate::service::{EngagementService, FeedService, NotificationLog};

pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/all", get(all_posts))
        .route("/following", get(following_posts))
        .route("/likes/:id", get(liked_posts))
        .route("/user/:username", get(user_posts))
        .route("/create", post(create_post))
        .route("/like/:id", post(like_unlike))
        .route("/comment/:id", post(comment_on_post))
        .route("/:id", delete(delete_post))
}

fn build_feed_service(state: &AppState) -> FeedService {
    FeedService::new(state.db.clone())
}

fn build_engagement_service(state: &AppState) -> EngagementService {
    EngagementService::new(
        state.db.clone(),
        state.media.clone(),
        Arc::new(NotificationLog::new(state.db.clone())),
    )
}

/// GET /api/posts/all
async fn all_posts(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = build_feed_service(&state).global_feed().await?;
    Ok(Json(posts_to_response(&posts)))
}

/// GET /api/posts/following
async fn following_posts(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = build_feed_service(&state)
        .following_feed(&account.id)
        .await?;
    Ok(Json(posts_to_response(&posts)))
}

/// GET /api/posts/likes/:id
async fn liked_posts(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = build_feed_service(&state)
        .liked_feed(&AccountId::from_string(id))
        .await?;
    Ok(Json(posts_to_response(&posts)))
}

/// GET /api/posts/user/:username
async fn user_posts(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let posts = build_feed_service(&state).user_feed(&username).await?;
    Ok(Json(posts_to_response(&posts)))
}

/// POST /api/posts/create
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), AppError> {
    let post = build_engagement_service(&state)
        .create_post(&account.id, req.text, req.img)
        .await?;
    Ok((StatusCode::CREATED, Json(post_to_response(&post))))
}

/// POST /api/posts/like/:id
async fn like_unlike(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post = build_engagement_service(&state)
        .like_unlike(&account.id, &PostId::from_string(id))
        .await?;
    Ok(Json(post_to_response(&post)))
}

/// POST /api/posts/comment/:id
async fn comment_on_post(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let text = req.text.unwrap_or_default();
    let post = build_engagement_service(&state)
        .comment(&account.id, &PostId::from_string(id), &text)
        .await?;
    Ok(Json(post_to_response(&post)))
}

/// DELETE /api/posts/:id
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    build_engagement_service(&state)
        .delete_post(&account.id, &PostId::from_string(id))
        .await?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
