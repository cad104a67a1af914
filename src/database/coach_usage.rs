// ABOUTME: Server-side AI coach usage meter keyed by email
// ABOUTME: Increments are a single atomic UPDATE guarded by the unlimited flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::{parse_timestamp, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::CoachUsage;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Coach usage operations manager
pub struct CoachUsageManager {
    pool: SqlitePool,
}

impl CoachUsageManager {
    /// Create a new coach usage manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register an email with the meter, carrying over the count the client
    /// accumulated anonymously. Idempotent: if the email already has a row,
    /// that row is returned unchanged and `initial_count` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if lookup or insert fails
    pub async fn register_email(
        &self,
        email: &str,
        initial_count: i64,
    ) -> AppResult<CoachUsage> {
        if let Some(existing) = self.get_by_email(email).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO coach_usage (id, email, message_count, has_unlimited_access, created_at, updated_at)
            VALUES ($1, $2, $3, 0, $4, $4)
            ",
        )
        .bind(id.to_string())
        .bind(email)
        .bind(initial_count)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to register coach usage: {e}")))?;

        Ok(CoachUsage {
            id,
            email: email.to_owned(),
            message_count: initial_count,
            has_unlimited_access: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch the meter row for an email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<CoachUsage>> {
        let row = sqlx::query(
            r"
            SELECT id, email, message_count, has_unlimited_access, created_at, updated_at
            FROM coach_usage WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get coach usage: {e}")))?;

        row.map(|r| row_to_usage(&r)).transpose()
    }

    /// Count one completed exchange. A single UPDATE reads and writes the
    /// counter in place, so concurrent exchanges never lose increments.
    /// Unlimited rows are skipped by the WHERE clause.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is not registered or the update fails
    pub async fn increment_message_count(&self, email: &str) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE coach_usage
            SET message_count = message_count + 1, updated_at = $1
            WHERE email = $2 AND has_unlimited_access = 0
            ",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to increment message count: {e}")))?;

        if result.rows_affected() == 0 {
            // Either unregistered or unlimited; only the former is an error
            if self.get_by_email(email).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "No coach usage record for {email}"
                )));
            }
        }
        Ok(())
    }

    /// Flip the unlimited flag for an email, creating the meter row if the
    /// buyer never used the coach before purchasing.
    ///
    /// # Errors
    ///
    /// Returns an error if lookup, insert, or update fails
    pub async fn grant_unlimited_access(&self, email: &str) -> AppResult<()> {
        if self.get_by_email(email).await?.is_none() {
            self.register_email(email, 0).await?;
        }

        sqlx::query(
            r"
            UPDATE coach_usage
            SET has_unlimited_access = 1, updated_at = $1
            WHERE email = $2
            ",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to grant unlimited access: {e}")))?;
        Ok(())
    }
}

fn row_to_usage(row: &SqliteRow) -> AppResult<CoachUsage> {
    Ok(CoachUsage {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        email: row.get("email"),
        message_count: row.get("message_count"),
        has_unlimited_access: row.get::<i64, _>("has_unlimited_access") != 0,
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}
