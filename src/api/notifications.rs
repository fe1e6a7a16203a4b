use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::auth::Authenticated;
use super::error::ApiError;
use super::validation::require_uuid;
use crate::auth::Operation;
use crate::db::{Notification, UnreadCountResponse};
use crate::AppState;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let identity = caller.require(&state, Operation::ListNotifications)?;
    let notifications = state
        .notifications
        .list_for_instructor(&identity.user_id)
        .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let identity = caller.require(&state, Operation::CountUnreadNotifications)?;
    let unread = state.notifications.count_unread(&identity.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let identity = caller.require(&state, Operation::MarkNotificationRead)?;
    require_uuid(&id, "notification_id")?;

    state.notifications.mark_read(&identity.user_id, &id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}
