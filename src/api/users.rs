//! Account endpoints: profiles, suggestions, follow toggle, profile edits

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};

use crate::AppState;
use crate::api::dto::{AccountResponse, FollowResponse, UpdateProfileRequest};
use crate::api::{account_to_response, profile_to_response};
use crate::auth::CurrentUser;
use crate::data::AccountId;
use crate::error::AppError;
use crate::service::{AccountService, EngagementService, FeedService, FollowState, NotificationLog};

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/profile/:username", get(get_profile))
        .route("/suggested", get(get_suggested))
        .route("/follow/:id", post(follow_unfollow))
        .route("/update", post(update_profile))
}

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.media.clone())
}

fn build_engagement_service(state: &AppState) -> EngagementService {
    EngagementService::new(
        state.db.clone(),
        state.media.clone(),
        Arc::new(NotificationLog::new(state.db.clone())),
    )
}

/// GET /api/users/profile/:username
async fn get_profile(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<AccountResponse>, AppError> {
    let profile = build_account_service(&state).get_profile(&username).await?;
    Ok(Json(profile_to_response(&profile)))
}

/// GET /api/users/suggested
async fn get_suggested(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let suggestions = FeedService::new(state.db.clone())
        .suggested_accounts(&account.id)
        .await?;
    Ok(Json(suggestions.iter().map(account_to_response).collect()))
}

/// POST /api/users/follow/:id
async fn follow_unfollow(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FollowResponse>, AppError> {
    let target = AccountId::from_string(id);
    let follow_state = build_engagement_service(&state)
        .follow_unfollow(&account.id, &target)
        .await?;

    let response = match follow_state {
        FollowState::Followed => FollowResponse {
            message: "User followed successfully".to_string(),
            following: true,
        },
        FollowState::Unfollowed => FollowResponse {
            message: "User unfollowed successfully".to_string(),
            following: false,
        },
    };
    Ok(Json(response))
}

/// POST /api/users/update
async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let profile = build_account_service(&state)
        .update_profile(&account.id, req.into())
        .await?;
    Ok(Json(profile_to_response(&profile)))
}
