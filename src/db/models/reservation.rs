//! Student reservations against class offerings.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub class_id: String,
    pub status: ReservationStatus,
    pub created_at: String,
}

/// A student's reservation joined with the class and its instructor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentReservation {
    pub id: String,
    pub status: ReservationStatus,
    pub created_at: String,
    pub class_id: String,
    pub title: String,
    pub description: String,
    pub schedule_time: String,
    pub price: f64,
    pub instructor_name: String,
}

/// A reservation on an instructor's class joined with the student identity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub id: String,
    pub status: ReservationStatus,
    pub created_at: String,
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
}
