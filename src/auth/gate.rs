//! Authorization gate: token verification followed by a role allow-list check.
//!
//! Every protected operation is named in [`Operation`] and mapped to the roles
//! that may perform it. Handlers authenticate first, then authorize against the
//! operation, before reaching any registry or ledger.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;

use super::{AuthError, Identity, TokenService};
use crate::db::Role;

/// Protected operations exposed over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Browse the class catalogue with filters
    ListClasses,
    ReserveClass,
    ListOwnReservations,
    CancelReservation,
    /// Instructor view of every class
    ListAllClasses,
    ListOwnedClasses,
    CreateClass,
    UpdateClass,
    DeleteClass,
    ViewClassRoster,
    ListNotifications,
    CountUnreadNotifications,
    MarkNotificationRead,
    ViewProfile,
    UploadPhoto,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::ListClasses,
        Operation::ReserveClass,
        Operation::ListOwnReservations,
        Operation::CancelReservation,
        Operation::ListAllClasses,
        Operation::ListOwnedClasses,
        Operation::CreateClass,
        Operation::UpdateClass,
        Operation::DeleteClass,
        Operation::ViewClassRoster,
        Operation::ListNotifications,
        Operation::CountUnreadNotifications,
        Operation::MarkNotificationRead,
        Operation::ViewProfile,
        Operation::UploadPhoto,
    ];

    /// Built-in allow-list. `ListClasses` is overridable through config.
    fn default_roles(self) -> &'static [Role] {
        use Operation::*;
        match self {
            ReserveClass | ListOwnReservations | CancelReservation => &[Role::Student],
            ListAllClasses | ListOwnedClasses | CreateClass | UpdateClass | DeleteClass
            | ViewClassRoster | ListNotifications | CountUnreadNotifications
            | MarkNotificationRead => &[Role::Instructor],
            ListClasses | ViewProfile | UploadPhoto => &[Role::Student, Role::Instructor],
        }
    }
}

/// Role allow-list per operation
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: HashMap<Operation, Vec<Role>>,
}

impl AccessPolicy {
    /// Build the policy, using `list_classes` for the catalogue listing.
    pub fn new(list_classes: Vec<Role>) -> Self {
        let mut rules: HashMap<Operation, Vec<Role>> = Operation::ALL
            .iter()
            .map(|op| (*op, op.default_roles().to_vec()))
            .collect();
        rules.insert(Operation::ListClasses, list_classes);
        Self { rules }
    }

    pub fn allowed_roles(&self, operation: Operation) -> &[Role] {
        self.rules
            .get(&operation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn permits(&self, role: Role, operation: Operation) -> bool {
        self.allowed_roles(operation).contains(&role)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(Operation::ListClasses.default_roles().to_vec())
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    tokens: TokenService,
    policy: AccessPolicy,
}

impl AuthorizationGate {
    pub fn new(tokens: TokenService, policy: AccessPolicy) -> Self {
        Self { tokens, policy }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Establish the caller from the `Authorization: Bearer` header.
    ///
    /// A missing header or bearer token is `MissingToken`; a token that fails
    /// verification is `InvalidToken`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = extract_bearer(headers).ok_or(AuthError::MissingToken)?;
        self.tokens.verify(token)
    }

    pub fn authorize(&self, identity: &Identity, operation: Operation) -> Result<(), AuthError> {
        if self.policy.permits(identity.role, operation) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %identity.user_id,
                role = %identity.role,
                ?operation,
                "Operation denied by role policy"
            );
            Err(AuthError::Forbidden(identity.role))
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
