//! Class registry, reservation ledger and instructor notifications.
//!
//! Each component owns a handle to the connection pool and exposes its
//! operations as async methods returning [`BookingError`].

pub mod classes;
pub mod notifications;
pub mod reservations;

pub use classes::ClassRegistry;
pub use notifications::NotificationChannel;
pub use reservations::ReservationLedger;

use thiserror::Error;

/// Errors raised by booking operations
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The resource does not exist or belongs to someone else; callers cannot
    /// tell which.
    #[error("Resource not found or not owned by the caller")]
    NotOwnerOrNotFound,

    #[error("Class not found")]
    ClassNotFound,

    #[error("Class is full")]
    CapacityExceeded,

    #[error("Class already reserved by this student")]
    AlreadyReserved,

    #[error("Capacity {requested} is below the {confirmed} confirmed reservations")]
    CapacityBelowReservations { requested: i64, confirmed: i64 },

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BookingError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// True when a sqlx error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}
