//! Input validation for API requests.
//!
//! Field validators return `Err(message)`; request-level validators collect
//! them into an [`ApiError`] through [`ValidationErrorBuilder`].

use axum::{extract::rejection::JsonRejection, Json};
use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::accounts::NewAccount;
use crate::db::{RegisterRequest, Role};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

lazy_static! {
    /// Pragmatic email shape check: local@domain.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();

    static ref UUID_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name is too long (max {} characters)", MAX_NAME_LEN));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err("Email is too long".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_LEN
        ));
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<Role, String> {
    if role.trim().is_empty() {
        return Err("Role is required".to_string());
    }
    role.parse::<Role>()
        .map_err(|_| "Invalid role. Must be one of: student, instructor".to_string())
}

/// Validate a resource id taken from the URL
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if UUID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(format!("Invalid {} format", field_name))
    }
}

/// Reject a malformed path id before it reaches the database
pub fn require_uuid(id: &str, field_name: &str) -> Result<(), ApiError> {
    validate_uuid(id, field_name).map_err(|e| ApiError::validation_field(field_name, e))
}

/// Unwrap a JSON body taken as `Result<Json<T>, JsonRejection>`. Handlers
/// call this after the role check.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::validation_field("body", rejection.body_text()))
        }
    }
}

/// Check every registration field and produce the account to create
pub fn validate_register_request(req: RegisterRequest) -> Result<NewAccount, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let name = req.name.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let role = req.role.unwrap_or_default();

    if let Err(e) = validate_name(&name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_email(&email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&password) {
        errors.add("password", e);
    }
    let role = validate_role(&role);
    if let Err(e) = &role {
        errors.add("role", e.as_str());
    }

    errors.finish()?;

    Ok(NewAccount {
        name,
        email,
        password,
        role: role.map_err(|e| ApiError::validation_field("role", e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@@x.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_role() {
        assert_eq!(validate_role("student").unwrap(), Role::Student);
        assert_eq!(validate_role("Instructor").unwrap(), Role::Instructor);
        assert!(validate_role("employee").is_err());
        assert!(validate_role("").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("0b3f5a0e-8f6d-4a53-9a3e-2f0e6b1c9d10", "id").is_ok());
        assert!(validate_uuid("not-a-uuid", "id").is_err());
        assert!(validate_uuid("", "id").is_err());
    }

    #[test]
    fn test_register_request_collects_all_missing_fields() {
        let err = validate_register_request(RegisterRequest::default()).unwrap_err();
        assert!(err.to_string().contains("4 fields"));
    }

    #[test]
    fn test_register_request_ok() {
        let account = validate_register_request(RegisterRequest {
            name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            password: Some("long-enough".to_string()),
            role: Some("instructor".to_string()),
        })
        .unwrap();
        assert_eq!(account.role, Role::Instructor);
    }
}
