// ABOUTME: Marketing storage: email subscribers, lead magnets, and payment event records
// ABOUTME: Payment events are recorded after processing so failed events get retried
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::{parse_timestamp, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::{EmailSubscriber, LeadMagnet};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Marketing operations manager
pub struct MarketingManager {
    pool: SqlitePool,
}

impl MarketingManager {
    /// Create a new marketing manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    /// Subscribe an email to the newsletter. A duplicate email returns the
    /// existing row instead of erroring.
    ///
    /// # Errors
    ///
    /// Returns an error if lookup or insert fails
    pub async fn subscribe(
        &self,
        email: &str,
        name: Option<&str>,
        source: Option<&str>,
    ) -> AppResult<EmailSubscriber> {
        if let Some(existing) = self.get_subscriber(email).await? {
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO email_subscribers (id, email, name, source, subscribed_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id.to_string())
        .bind(email)
        .bind(name)
        .bind(source)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create subscriber: {e}")))?;

        Ok(EmailSubscriber {
            id,
            email: email.to_owned(),
            name: name.map(ToOwned::to_owned),
            source: source.map(ToOwned::to_owned),
            subscribed_at: now,
        })
    }

    /// Look up a subscriber by email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_subscriber(&self, email: &str) -> AppResult<Option<EmailSubscriber>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, source, subscribed_at
            FROM email_subscribers WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get subscriber: {e}")))?;

        row.map(|r| row_to_subscriber(&r)).transpose()
    }

    // ========================================================================
    // Lead magnets
    // ========================================================================

    /// Fetch a lead magnet by slug
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_lead_magnet(&self, slug: &str) -> AppResult<Option<LeadMagnet>> {
        let row = sqlx::query(
            r"
            SELECT id, slug, title, file_url, download_count, created_at
            FROM lead_magnets WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get lead magnet: {e}")))?;

        row.map(|r| row_to_lead_magnet(&r)).transpose()
    }

    /// Record a lead magnet download and bump its counter
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails
    pub async fn record_download(&self, lead_magnet_id: Uuid, email: &str) -> AppResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO lead_magnet_downloads (id, lead_magnet_id, email, downloaded_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(lead_magnet_id.to_string())
        .bind(email)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record download: {e}")))?;

        sqlx::query(
            "UPDATE lead_magnets SET download_count = download_count + 1 WHERE id = $1",
        )
        .bind(lead_magnet_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to bump download count: {e}")))?;

        Ok(())
    }

    /// Insert a lead magnet (seeding and admin tooling)
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_lead_magnet(
        &self,
        slug: &str,
        title: &str,
        file_url: &str,
    ) -> AppResult<LeadMagnet> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO lead_magnets (id, slug, title, file_url, download_count, created_at)
            VALUES ($1, $2, $3, $4, 0, $5)
            ",
        )
        .bind(id.to_string())
        .bind(slug)
        .bind(title)
        .bind(file_url)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create lead magnet: {e}")))?;

        Ok(LeadMagnet {
            id,
            slug: slug.to_owned(),
            title: title.to_owned(),
            file_url: file_url.to_owned(),
            download_count: 0,
            created_at: now,
        })
    }

    // ========================================================================
    // Payment events
    // ========================================================================

    /// True when the event id has already been recorded as processed
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn has_payment_event(&self, stripe_event_id: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM payment_events WHERE stripe_event_id = $1")
            .bind(stripe_event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to check payment event: {e}")))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    /// Record a payment event as processed. Called only after the event's
    /// side effects have been committed; a failed event stays unrecorded so
    /// redelivery retries it. Returns false when the id was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails for a reason other than a
    /// duplicate event id
    pub async fn record_payment_event(
        &self,
        stripe_event_id: &str,
        event_type: &str,
        payload: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO payment_events (id, stripe_event_id, event_type, payload, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(stripe_event_id)
        .bind(event_type)
        .bind(payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record payment event: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_subscriber(row: &SqliteRow) -> AppResult<EmailSubscriber> {
    Ok(EmailSubscriber {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        email: row.get("email"),
        name: row.get("name"),
        source: row.get("source"),
        subscribed_at: parse_timestamp("subscribed_at", &row.get::<String, _>("subscribed_at"))?,
    })
}

fn row_to_lead_magnet(row: &SqliteRow) -> AppResult<LeadMagnet> {
    Ok(LeadMagnet {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        slug: row.get("slug"),
        title: row.get("title"),
        file_url: row.get("file_url"),
        download_count: row.get("download_count"),
        created_at: parse_timestamp("created_at", &row.get::<String, _>("created_at"))?,
    })
}
