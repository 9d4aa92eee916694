//! Notification endpoints

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get},
};

use crate::AppState;
use crate::api::dto::{MessageResponse, NotificationResponse, UnreadCountResponse};
use crate::api::notification_to_response;
use crate::auth::CurrentUser;
use crate::data::EntityId;
use crate::error::AppError;
use crate::service::NotificationLog;

pub fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_notifications).delete(clear_notifications))
        .route("/unread_count", get(unread_count))
        .route("/:id", delete(delete_notification))
}

/// GET /api/notifications
///
/// Listing marks the returned notifications as read.
async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = NotificationLog::new(state.db.clone())
        .list(&account.id)
        .await?;
    Ok(Json(
        notifications.iter().map(notification_to_response).collect(),
    ))
}

/// GET /api/notifications/unread_count
async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = NotificationLog::new(state.db.clone())
        .unread_count(&account.id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// DELETE /api/notifications
async fn clear_notifications(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<MessageResponse>, AppError> {
    NotificationLog::new(state.db.clone())
        .clear(&account.id)
        .await?;
    Ok(Json(MessageResponse::new(
        "Notifications deleted successfully",
    )))
}

/// DELETE /api/notifications/:id
async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    NotificationLog::new(state.db.clone())
        .delete(&account.id, &EntityId::from_string(id))
        .await?;
    Ok(Json(MessageResponse::new(
        "Notification deleted successfully",
    )))
}
