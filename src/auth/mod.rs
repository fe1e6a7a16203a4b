//! Identity tokens, credential hashing and the authorization gate.

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{AccessPolicy, AuthorizationGate, Operation};
pub use token::{Claims, TokenService};

use serde::Serialize;
use thiserror::Error;

use crate::db::Role;

/// The caller as established by a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

/// Errors raised while establishing or checking an identity
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication token not provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Role {0} is not allowed to perform this action")]
    Forbidden(Role),

    #[error("Failed to issue token: {0}")]
    Issue(#[from] jsonwebtoken::errors::Error),
}
