//! Class offerings owned by instructors.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassOffering {
    pub id: String,
    pub title: String,
    pub description: String,
    pub schedule_time: String,
    pub capacity: i64,
    pub price: f64,
    pub instructor_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Class row joined with its instructor's name and current occupancy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub schedule_time: String,
    pub capacity: i64,
    pub price: f64,
    pub instructor_id: String,
    pub instructor_name: String,
    pub reserved: i64,
}

/// Catalogue filters; each is a case-insensitive substring match
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassFilter {
    /// Instructor name fragment
    pub instructor: Option<String>,
    /// Schedule fragment (date or hour)
    pub time: Option<String>,
}

/// Body for creating or replacing a class
#[derive(Debug, Clone, Deserialize)]
pub struct ClassFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub schedule_time: String,
    pub capacity: i64,
    #[serde(default)]
    pub price: f64,
}
