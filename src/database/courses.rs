// ABOUTME: Course content graph storage: modules and lessons per product
// ABOUTME: All listings are ordered by sort_order, never by insertion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::{CourseLesson, CourseModule};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Course content operations manager
pub struct CoursesManager {
    pool: SqlitePool,
}

impl CoursesManager {
    /// Create a new courses manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List the modules of a product ordered by `sort_order`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_modules(&self, product_id: &str) -> AppResult<Vec<CourseModule>> {
        let rows = sqlx::query(
            r"
            SELECT id, product_id, module_number, title, description, unlock_day, sort_order
            FROM course_modules
            WHERE product_id = $1
            ORDER BY sort_order ASC
            ",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list modules: {e}")))?;

        rows.iter().map(row_to_module).collect()
    }

    /// List the lessons of a module ordered by `sort_order`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_lessons(&self, module_id: Uuid) -> AppResult<Vec<CourseLesson>> {
        let rows = sqlx::query(
            r"
            SELECT id, module_id, lesson_number, title, description, video_url, workbook_url, duration_seconds, sort_order
            FROM course_lessons
            WHERE module_id = $1
            ORDER BY sort_order ASC
            ",
        )
        .bind(module_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list lessons: {e}")))?;

        rows.iter().map(row_to_lesson).collect()
    }

    /// Fetch one lesson together with its owning product id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_lesson_with_product(
        &self,
        lesson_id: Uuid,
    ) -> AppResult<Option<(CourseLesson, String)>> {
        let row = sqlx::query(
            r"
            SELECT l.id, l.module_id, l.lesson_number, l.title, l.description,
                   l.video_url, l.workbook_url, l.duration_seconds, l.sort_order,
                   m.product_id
            FROM course_lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE l.id = $1
            ",
        )
        .bind(lesson_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get lesson: {e}")))?;

        row.map(|r| {
            let lesson = row_to_lesson(&r)?;
            let product_id: String = r.get("product_id");
            Ok((lesson, product_id))
        })
        .transpose()
    }

    /// Total number of lessons across all modules of a product.
    /// This is the denominator of the progress percentage.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count_lessons(&self, product_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM course_lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count lessons: {e}")))?;

        Ok(row.get("count"))
    }

    /// Insert a module (seeding and admin tooling)
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_module(&self, module: &CourseModule) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO course_modules (id, product_id, module_number, title, description, unlock_day, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(module.id.to_string())
        .bind(&module.product_id)
        .bind(module.module_number)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.unlock_day)
        .bind(module.sort_order)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create module: {e}")))?;
        Ok(())
    }

    /// Insert a lesson (seeding and admin tooling)
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_lesson(&self, lesson: &CourseLesson) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO course_lessons (id, module_id, lesson_number, title, description, video_url, workbook_url, duration_seconds, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(lesson.id.to_string())
        .bind(lesson.module_id.to_string())
        .bind(lesson.lesson_number)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.video_url)
        .bind(&lesson.workbook_url)
        .bind(lesson.duration_seconds)
        .bind(lesson.sort_order)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create lesson: {e}")))?;
        Ok(())
    }
}

fn row_to_module(row: &SqliteRow) -> AppResult<CourseModule> {
    Ok(CourseModule {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        product_id: row.get("product_id"),
        module_number: row.get("module_number"),
        title: row.get("title"),
        description: row.get("description"),
        unlock_day: row.get("unlock_day"),
        sort_order: row.get("sort_order"),
    })
}

fn row_to_lesson(row: &SqliteRow) -> AppResult<CourseLesson> {
    Ok(CourseLesson {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        module_id: parse_uuid("module_id", &row.get::<String, _>("module_id"))?,
        lesson_number: row.get("lesson_number"),
        title: row.get("title"),
        description: row.get("description"),
        video_url: row.get("video_url"),
        workbook_url: row.get("workbook_url"),
        duration_seconds: row.get("duration_seconds"),
        sort_order: row.get("sort_order"),
    })
}
