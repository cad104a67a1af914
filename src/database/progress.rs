// ABOUTME: Lesson completion tracking with an idempotent upsert per (user, lesson)
// ABOUTME: Aggregate percentages are derived at read time, never stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::{parse_timestamp, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::LessonProgress;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Lesson progress operations manager
pub struct ProgressManager {
    pool: SqlitePool,
}

impl ProgressManager {
    /// Create a new progress manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark a lesson complete. Idempotent: a repeat mark refreshes
    /// `completed_at` on the existing row instead of inserting a second one.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn mark_lesson_complete(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        product_id: &str,
    ) -> AppResult<LessonProgress> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO course_progress (id, user_id, lesson_id, product_id, completed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET completed_at = excluded.completed_at
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .bind(product_id)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to mark lesson complete: {e}")))?;

        // The upsert may have kept the original row id; read it back
        let row = sqlx::query(
            r"
            SELECT id, user_id, lesson_id, product_id, completed_at
            FROM course_progress
            WHERE user_id = $1 AND lesson_id = $2
            ",
        )
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to read back progress row: {e}")))?;

        row_to_progress(&row)
    }

    /// Ids of the lessons the user has completed for a product
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn completed_lesson_ids(
        &self,
        user_id: Uuid,
        product_id: &str,
    ) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query(
            r"
            SELECT lesson_id FROM course_progress
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id.to_string())
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list completed lessons: {e}")))?;

        rows.iter()
            .map(|r| parse_uuid("lesson_id", &r.get::<String, _>("lesson_id")))
            .collect()
    }

    /// Number of completed lessons the user has for a product
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count_completed(&self, user_id: Uuid, product_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM course_progress
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id.to_string())
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count completed lessons: {e}")))?;

        Ok(row.get("count"))
    }
}

/// Whole-number progress percentage, rounded half up.
/// Zero lessons means zero percent, not a division error.
#[must_use]
pub fn progress_percentage(completed: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64) * 100.0;
    pct.round() as u8
}

fn row_to_progress(row: &SqliteRow) -> AppResult<LessonProgress> {
    Ok(LessonProgress {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        user_id: parse_uuid("user_id", &row.get::<String, _>("user_id"))?,
        lesson_id: parse_uuid("lesson_id", &row.get::<String, _>("lesson_id"))?,
        product_id: row.get("product_id"),
        completed_at: parse_timestamp("completed_at", &row.get::<String, _>("completed_at"))?,
    })
}
