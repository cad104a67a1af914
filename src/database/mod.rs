// ABOUTME: Database connection management and migration runner for SQLite
// ABOUTME: Exposes per-table manager structs that own all SQL in the crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

/// Coach usage metering (message counts, unlimited flag)
pub mod coach_usage;
/// Course modules and lessons
pub mod courses;
/// Email subscribers, lead magnets, and payment event records
pub mod marketing;
/// Lesson completion tracking
pub mod progress;
/// Purchase ledger
pub mod purchases;
/// User account storage
pub mod users;

pub use coach_usage::CoachUsageManager;
pub use courses::CoursesManager;
pub use marketing::MarketingManager;
pub use progress::ProgressManager;
pub use purchases::PurchasesManager;
pub use users::UsersManager;

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect and run pending migrations
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database URL is invalid or malformed
    /// - Database connection fails
    /// - `SQLite` file creation fails
    /// - Migration process fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // An in-memory database exists per connection, so the pool must be
        // pinned to a single never-expiring connection or the schema is lost
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await
        } else {
            // Ensure SQLite creates the database file if it doesn't exist
            let connection_options = if database_url.starts_with("sqlite:") {
                format!("{database_url}?mode=rwc")
            } else {
                database_url.to_owned()
            };
            SqlitePool::connect(&connection_options).await
        }
        .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the database pool
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run all pending migrations embedded at compile time from ./migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails or the connection is lost.
    pub async fn migrate(&self) -> AppResult<()> {
        info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;

        info!("Database migrations completed");
        Ok(())
    }
}

// ============================================================================
// Column helpers
// ============================================================================
// Ids and timestamps are stored as TEXT (hyphenated uuid / RFC 3339).

pub(crate) fn parse_uuid(column: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::database(format!("Invalid uuid in column {column}: {e}")))
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid timestamp in column {column}: {e}")))
}
