use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::Authenticated;
use super::error::{ApiError, ErrorCode};
use crate::auth::Operation;
use crate::db::{PhotoResponse, UserResponse};
use crate::AppState;

/// Multipart field carrying the avatar image
const PHOTO_FIELD: &str = "photo";

/// Profile of the calling user
pub async fn me(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
) -> Result<Json<UserResponse>, ApiError> {
    let identity = caller.require(&state, Operation::ViewProfile)?;
    Ok(Json(state.accounts.profile(&identity.user_id).await?))
}

/// Upload or replace the caller's profile photo
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    caller: Authenticated,
    mut multipart: Multipart,
) -> Result<Json<PhotoResponse>, ApiError> {
    let identity = caller.require(&state, Operation::UploadPhoto)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(upload_error)?;

        let photo = state
            .accounts
            .set_photo(&identity.user_id, &file_name, &data)
            .await?;
        return Ok(Json(PhotoResponse { photo }));
    }

    Err(ApiError::validation_field(PHOTO_FIELD, "No photo was uploaded"))
}

fn upload_error(err: MultipartError) -> ApiError {
    tracing::debug!("Failed to read upload: {}", err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::PayloadTooLarge, "Uploaded file is too large")
    } else {
        ApiError::bad_request("Failed to read uploaded file")
    }
}
