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
use crate::db::StudentReservation;
use crate::AppState;

/// The calling student's reservations, newest first
pub async fn list_my_reservations(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<Vec<StudentReservation>>, ApiError> {
    let identity = caller.require(&state, Operation::ListOwnReservations)?;
    let reservations = state.reservations.list_mine(&identity.user_id).await?;
    Ok(Json(reservations))
}

pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let identity = caller.require(&state, Operation::CancelReservation)?;
    require_uuid(&id, "reservation_id")?;

    state.reservations.cancel(&identity.user_id, &id).await?;
    Ok(Json(json!({ "message": "Reservation cancelled" })))
}
