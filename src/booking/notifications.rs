//! Instructor inbox. Entries are written by the reservation ledger and only
//! their read flag changes afterwards.

use sqlx::SqliteConnection;
use uuid::Uuid;

use super::BookingError;
use crate::db::{DbPool, Notification};

#[derive(Clone)]
pub struct NotificationChannel {
    db: DbPool,
}

impl NotificationChannel {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Newest first
    pub async fn list_for_instructor(
        &self,
        instructor_id: &str,
    ) -> Result<Vec<Notification>, BookingError> {
        Ok(sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE instructor_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(instructor_id)
        .fetch_all(&self.db)
        .await?)
    }

    /// Mark a notification read. Repeating the call on an already read
    /// notification succeeds.
    pub async fn mark_read(
        &self,
        instructor_id: &str,
        notification_id: &str,
    ) -> Result<(), BookingError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND instructor_id = ?")
                .bind(notification_id)
                .bind(instructor_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotOwnerOrNotFound);
        }
        Ok(())
    }

    pub async fn count_unread(&self, instructor_id: &str) -> Result<i64, BookingError> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE instructor_id = ? AND read = 0",
        )
        .bind(instructor_id)
        .fetch_one(&self.db)
        .await?)
    }
}

/// Append the reservation notice inside the caller's transaction.
pub(crate) async fn record_reservation(
    conn: &mut SqliteConnection,
    instructor_id: &str,
    student_id: &str,
    class_id: &str,
    message: &str,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO notifications (id, instructor_id, student_id, class_id, message, read, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(instructor_id)
    .bind(student_id)
    .bind(class_id)
    .bind(message)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}
