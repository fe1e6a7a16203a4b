//! Class management endpoints for instructors.
//!
//! The owning instructor always comes from the token, never from the body.
//! Update and delete on a class the caller does not own answer exactly like a
//! class that does not exist.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::auth::Authenticated;
use super::error::ApiError;
use super::validation::{json_body, require_uuid};
use crate::auth::Operation;
use crate::db::{ClassFields, ClassOffering, ClassSummary, RosterEntry};
use crate::AppState;

/// Every class on the platform
pub async fn list_all_classes(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<Vec<ClassSummary>>, ApiError> {
    caller.require(&state, Operation::ListAllClasses)?;
    Ok(Json(state.classes.list_all().await?))
}

/// Classes owned by the caller
pub async fn list_my_classes(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<Vec<ClassSummary>>, ApiError> {
    let identity = caller.require(&state, Operation::ListOwnedClasses)?;
    Ok(Json(state.classes.list_owned(&identity.user_id).await?))
}

pub async fn create_class(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    body: Result<Json<ClassFields>, JsonRejection>,
) -> Result<(StatusCode, Json<ClassOffering>), ApiError> {
    let identity = caller.require(&state, Operation::CreateClass)?;
    let fields = json_body(body)?;
    let class = state.classes.create(&identity.user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn update_class(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
    body: Result<Json<ClassFields>, JsonRejection>,
) -> Result<Json<ClassOffering>, ApiError> {
    let identity = caller.require(&state, Operation::UpdateClass)?;
    require_uuid(&id, "class_id")?;
    let fields = json_body(body)?;

    let class = state.classes.update(&identity.user_id, &id, fields).await?;
    Ok(Json(class))
}

pub async fn delete_class(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let identity = caller.require(&state, Operation::DeleteClass)?;
    require_uuid(&id, "class_id")?;

    state.classes.delete(&identity.user_id, &id).await?;
    Ok(Json(json!({ "message": "Class deleted" })))
}

/// Confirmed students on one of the caller's classes
pub async fn class_roster(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    let identity = caller.require(&state, Operation::ViewClassRoster)?;
    require_uuid(&id, "class_id")?;

    let roster = state
        .reservations
        .list_for_class(&identity.user_id, &id)
        .await?;
    Ok(Json(roster))
}
