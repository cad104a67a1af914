// ABOUTME: User account storage: creation, lookup, and find-or-create by email
// ABOUTME: Webhook-created accounts have no password until the user sets one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::{parse_timestamp, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::User;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// User database operations manager
pub struct UsersManager {
    pool: SqlitePool,
}

impl UsersManager {
    /// Create a new users manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user account
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already taken or the insert fails
    pub async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> AppResult<User> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO users (id, email, name, password_hash, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $5)
            ",
        )
        .bind(id.to_string())
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        Ok(User {
            id,
            email: email.to_owned(),
            name: name.map(ToOwned::to_owned),
            password_hash: password_hash.map(ToOwned::to_owned),
            created_at: now,
            last_active: now,
        })
    }

    /// Look up a user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, password_hash, created_at, last_active
            FROM users WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get user by email: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Look up a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, password_hash, created_at, last_active
            FROM users WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Return the existing user for `email` or create a passwordless account.
    /// Used by the payment webhook, where the buyer may not have signed up.
    ///
    /// # Errors
    ///
    /// Returns an error if lookup or insert fails
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> AppResult<User> {
        if let Some(user) = self.get_user_by_email(email).await? {
            return Ok(user);
        }
        self.create_user(email, name, None).await
    }

    /// Record authenticated activity for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn touch_last_active(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_active = $1 WHERE id = $2")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update last_active: {e}")))?;
        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
        last_active: parse_timestamp("last_active", &row.get::<String, _>("last_active"))?,
    })
}
