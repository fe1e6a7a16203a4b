//! Reservation ledger.
//!
//! `reserve` runs its capacity check, duplicate check, insert and notification
//! in one transaction whose first statement is a write. SQLite grants the
//! write lock to one transaction at a time, so concurrent reservations for the
//! same class are serialized and cannot oversell it. The partial unique index
//! `idx_reservations_confirmed_unique` backs the duplicate check.

use uuid::Uuid;

use super::notifications::record_reservation;
use super::{is_unique_violation, BookingError};
use crate::db::{DbPool, Reservation, ReservationStatus, RosterEntry, StudentReservation};

#[derive(Clone)]
pub struct ReservationLedger {
    db: DbPool,
}

impl ReservationLedger {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn reserve(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Reservation, BookingError> {
        let mut tx = self.db.begin().await?;

        // No-op write: takes the database write lock before anything is read.
        let locked = sqlx::query("UPDATE classes SET capacity = capacity WHERE id = ?")
            .bind(class_id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            return Err(BookingError::ClassNotFound);
        }

        let (title, instructor_id, capacity): (String, String, i64) =
            sqlx::query_as("SELECT title, instructor_id, capacity FROM classes WHERE id = ?")
                .bind(class_id)
                .fetch_one(&mut *tx)
                .await?;

        let already: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM reservations WHERE user_id = ? AND class_id = ? AND status = 'confirmed'",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?;
        if already.is_some() {
            return Err(BookingError::AlreadyReserved);
        }

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE class_id = ? AND status = 'confirmed'",
        )
        .bind(class_id)
        .fetch_one(&mut *tx)
        .await?;
        if confirmed >= capacity {
            tracing::info!(class_id, student_id, capacity, "Reservation rejected: class full");
            return Err(BookingError::CapacityExceeded);
        }

        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO reservations (id, user_id, class_id, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(student_id)
        .bind(class_id)
        .bind(ReservationStatus::Confirmed)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::AlreadyReserved
            } else {
                BookingError::Storage(e)
            }
        })?;

        let student_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(student_id)
            .fetch_one(&mut *tx)
            .await?;
        let message = format!("{} reserved a spot in {}", student_name, title);
        record_reservation(&mut *tx, &instructor_id, student_id, class_id, &message).await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %id,
            class_id,
            student_id,
            instructor_id = %instructor_id,
            "Class reserved"
        );

        Ok(Reservation {
            id,
            user_id: student_id.to_string(),
            class_id: class_id.to_string(),
            status: ReservationStatus::Confirmed,
            created_at: now,
        })
    }

    /// Cancel one of the student's confirmed reservations, freeing the seat.
    pub async fn cancel(&self, student_id: &str, reservation_id: &str) -> Result<(), BookingError> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET status = 'cancelled'
            WHERE id = ? AND user_id = ? AND status = 'confirmed'
            "#,
        )
        .bind(reservation_id)
        .bind(student_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotOwnerOrNotFound);
        }

        tracing::info!(reservation_id, student_id, "Reservation cancelled");
        Ok(())
    }

    /// The student's reservations with class details, newest first
    pub async fn list_mine(
        &self,
        student_id: &str,
    ) -> Result<Vec<StudentReservation>, BookingError> {
        Ok(sqlx::query_as::<_, StudentReservation>(
            r#"
            SELECT r.id, r.status, r.created_at,
                   c.id AS class_id, c.title, c.description, c.schedule_time, c.price,
                   u.name AS instructor_name
            FROM reservations r
            INNER JOIN classes c ON r.class_id = c.id
            INNER JOIN users u ON c.instructor_id = u.id
            WHERE r.user_id = ?
            ORDER BY r.created_at DESC, r.rowid DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?)
    }

    /// Confirmed students on a class. Ownership is part of the join, so a
    /// class belonging to someone else yields an empty roster.
    pub async fn list_for_class(
        &self,
        instructor_id: &str,
        class_id: &str,
    ) -> Result<Vec<RosterEntry>, BookingError> {
        Ok(sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT r.id, r.status, r.created_at,
                   s.id AS student_id, s.name AS student_name, s.email AS student_email
            FROM reservations r
            INNER JOIN classes c ON r.class_id = c.id AND c.instructor_id = ?
            INNER JOIN users s ON r.user_id = s.id
            WHERE r.class_id = ? AND r.status = 'confirmed'
            ORDER BY r.created_at ASC, r.rowid ASC
            "#,
        )
        .bind(instructor_id)
        .bind(class_id)
        .fetch_all(&self.db)
        .await?)
    }
}
