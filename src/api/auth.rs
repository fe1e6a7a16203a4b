use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::request::Parts,
    Json,
};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::{json_body, validate_register_request};
use crate::auth::{Identity, Operation};
use crate::db::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::AppState;

/// Create an account. The role is chosen by the caller.
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let account = validate_register_request(json_body(body)?)?;
    let user = state.accounts.register(account).await?;
    Ok(Json(user))
}

/// Exchange credentials for an identity token
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = json_body(body)?;
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation_field(
            "credentials",
            "Email and password are required",
        ));
    }

    let response = state.accounts.login(&email, &password).await?;
    Ok(Json(response))
}

/// The verified caller of a request.
///
/// Rejects with 401 when no bearer token is sent and 403 when the token does
/// not verify. Role checks happen in the handler through [`Authenticated::require`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl Authenticated {
    /// Check the caller's role against the allow-list for `operation`.
    pub fn require(self, state: &AppState, operation: Operation) -> Result<Identity, ApiError> {
        state.gate.authorize(&self.0, operation)?;
        Ok(self.0)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.gate.authenticate(&parts.headers)?;
        Ok(Authenticated(identity))
    }
}
