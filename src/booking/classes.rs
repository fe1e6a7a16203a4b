//! Class registry. Mutations are always scoped by the owning instructor.

use uuid::Uuid;

use super::BookingError;
use crate::db::{ClassFields, ClassFilter, ClassOffering, ClassSummary, DbPool};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_SCHEDULE_LEN: usize = 100;
const MAX_CAPACITY: i64 = 10_000;

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.title, c.description, c.schedule_time, c.capacity, c.price,
           c.instructor_id, u.name AS instructor_name,
           (SELECT COUNT(*) FROM reservations r
             WHERE r.class_id = c.id AND r.status = 'confirmed') AS reserved
    FROM classes c
    INNER JOIN users u ON c.instructor_id = u.id
"#;

#[derive(Clone)]
pub struct ClassRegistry {
    db: DbPool,
}

impl ClassRegistry {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Catalogue listing with optional instructor-name and schedule filters.
    pub async fn list(&self, filter: &ClassFilter) -> Result<Vec<ClassSummary>, BookingError> {
        let mut conditions = Vec::new();
        let mut bindings: Vec<String> = Vec::new();

        if let Some(instructor) = non_blank(&filter.instructor) {
            conditions.push("LOWER(u.name) LIKE ? ESCAPE '\\'");
            bindings.push(like_pattern(instructor));
        }

        if let Some(time) = non_blank(&filter.time) {
            conditions.push("LOWER(c.schedule_time) LIKE ? ESCAPE '\\'");
            bindings.push(like_pattern(time));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "{} {} ORDER BY c.schedule_time ASC, c.created_at ASC",
            SUMMARY_SELECT, where_clause
        );
        let mut query = sqlx::query_as::<_, ClassSummary>(&sql);
        for binding in &bindings {
            query = query.bind(binding);
        }

        Ok(query.fetch_all(&self.db).await?)
    }

    /// Every class in the system with its instructor name
    pub async fn list_all(&self) -> Result<Vec<ClassSummary>, BookingError> {
        self.list(&ClassFilter::default()).await
    }

    pub async fn list_owned(&self, instructor_id: &str) -> Result<Vec<ClassSummary>, BookingError> {
        let sql = format!(
            "{} WHERE c.instructor_id = ? ORDER BY c.schedule_time ASC, c.created_at ASC",
            SUMMARY_SELECT
        );
        Ok(sqlx::query_as::<_, ClassSummary>(&sql)
            .bind(instructor_id)
            .fetch_all(&self.db)
            .await?)
    }

    #[cfg(test)]
    pub async fn get(&self, class_id: &str) -> Result<Option<ClassOffering>, BookingError> {
        Ok(
            sqlx::query_as::<_, ClassOffering>("SELECT * FROM classes WHERE id = ?")
                .bind(class_id)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    /// Create a class owned by `instructor_id`, which must come from the
    /// caller's verified identity.
    pub async fn create(
        &self,
        instructor_id: &str,
        fields: ClassFields,
    ) -> Result<ClassOffering, BookingError> {
        let fields = validate_fields(fields)?;
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO classes (id, title, description, schedule_time, capacity, price, instructor_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.schedule_time)
        .bind(fields.capacity)
        .bind(fields.price)
        .bind(instructor_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::info!(class_id = %id, instructor_id, title = %fields.title, "Class created");

        let class = sqlx::query_as::<_, ClassOffering>("SELECT * FROM classes WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.db)
            .await?;
        Ok(class)
    }

    /// Replace a class's fields. Fails with `NotOwnerOrNotFound` when no class
    /// with this id belongs to `instructor_id`.
    pub async fn update(
        &self,
        instructor_id: &str,
        class_id: &str,
        fields: ClassFields,
    ) -> Result<ClassOffering, BookingError> {
        let fields = validate_fields(fields)?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.db.begin().await?;

        // Write first so the transaction holds the write lock before the
        // occupancy read below.
        let result = sqlx::query(
            r#"
            UPDATE classes
            SET title = ?, description = ?, schedule_time = ?, capacity = ?, price = ?, updated_at = ?
            WHERE id = ? AND instructor_id = ?
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.schedule_time)
        .bind(fields.capacity)
        .bind(fields.price)
        .bind(&now)
        .bind(class_id)
        .bind(instructor_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotOwnerOrNotFound);
        }

        let confirmed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE class_id = ? AND status = 'confirmed'",
        )
        .bind(class_id)
        .fetch_one(&mut *tx)
        .await?;

        if fields.capacity < confirmed {
            return Err(BookingError::CapacityBelowReservations {
                requested: fields.capacity,
                confirmed,
            });
        }

        let class = sqlx::query_as::<_, ClassOffering>("SELECT * FROM classes WHERE id = ?")
            .bind(class_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(class_id, instructor_id, "Class updated");
        Ok(class)
    }

    /// Delete a class and its reservations. Notifications already sent stay.
    pub async fn delete(&self, instructor_id: &str, class_id: &str) -> Result<(), BookingError> {
        let result = sqlx::query("DELETE FROM classes WHERE id = ? AND instructor_id = ?")
            .bind(class_id)
            .bind(instructor_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotOwnerOrNotFound);
        }

        tracing::info!(class_id, instructor_id, "Class deleted");
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `%fragment%` with LIKE wildcards in the fragment escaped
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn validate_fields(mut fields: ClassFields) -> Result<ClassFields, BookingError> {
    fields.title = fields.title.trim().to_string();
    fields.description = fields.description.trim().to_string();
    fields.schedule_time = fields.schedule_time.trim().to_string();

    if fields.title.is_empty() {
        return Err(BookingError::validation("title", "Title is required"));
    }
    if fields.title.chars().count() > MAX_TITLE_LEN {
        return Err(BookingError::validation(
            "title",
            format!("Title must be {} characters or less", MAX_TITLE_LEN),
        ));
    }
    if fields.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(BookingError::validation(
            "description",
            format!("Description must be {} characters or less", MAX_DESCRIPTION_LEN),
        ));
    }
    if fields.schedule_time.is_empty() {
        return Err(BookingError::validation("schedule_time", "Schedule is required"));
    }
    if fields.schedule_time.chars().count() > MAX_SCHEDULE_LEN {
        return Err(BookingError::validation(
            "schedule_time",
            format!("Schedule must be {} characters or less", MAX_SCHEDULE_LEN),
        ));
    }
    if fields.capacity < 1 || fields.capacity > MAX_CAPACITY {
        return Err(BookingError::validation(
            "capacity",
            format!("Capacity must be between 1 and {}", MAX_CAPACITY),
        ));
    }
    if !fields.price.is_finite() || fields.price < 0.0 {
        return Err(BookingError::validation(
            "price",
            "Price must be a non-negative number",
        ));
    }

    Ok(fields)
}
