//! Class catalogue endpoints for students.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::auth::Authenticated;
use super::error::ApiError;
use super::validation::require_uuid;
use crate::auth::Operation;
use crate::db::{ClassFilter, ClassSummary, Reservation};
use crate::AppState;

/// List classes, optionally filtered by instructor name and schedule text
pub async fn list_classes(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Query(filter): Query<ClassFilter>,
) -> Result<Json<Vec<ClassSummary>>, ApiError> {
    caller.require(&state, Operation::ListClasses)?;
    let classes = state.classes.list(&filter).await?;
    Ok(Json(classes))
}

/// Reserve a seat in a class for the calling student
pub async fn reserve_class(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let identity = caller.require(&state, Operation::ReserveClass)?;
    require_uuid(&id, "class_id")?;

    let reservation = state.reservations.reserve(&identity.user_id, &id).await?;
    Ok(Json(reservation))
}
