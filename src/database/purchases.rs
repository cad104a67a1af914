// ABOUTME: Purchase ledger storage and the completed-purchase access query
// ABOUTME: Access is granted by status, never by row existence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::{parse_timestamp, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::{Purchase, PurchaseStatus};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Purchase ledger operations manager
pub struct PurchasesManager {
    pool: SqlitePool,
}

impl PurchasesManager {
    /// Create a new purchases manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a purchase
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_purchase(
        &self,
        user_id: Uuid,
        product_id: &str,
        amount: i64,
        currency: &str,
        status: PurchaseStatus,
        stripe_session_id: Option<&str>,
    ) -> AppResult<Purchase> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r"
            INSERT INTO purchases (id, user_id, product_id, amount, currency, status, stripe_session_id, purchased_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(product_id)
        .bind(amount)
        .bind(currency)
        .bind(status.as_str())
        .bind(stripe_session_id)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create purchase: {e}")))?;

        Ok(Purchase {
            id,
            user_id,
            product_id: product_id.to_owned(),
            amount,
            currency: currency.to_owned(),
            status,
            stripe_session_id: stripe_session_id.map(ToOwned::to_owned),
            purchased_at: now,
        })
    }

    /// True iff the user has a purchase for the product with status
    /// `completed`. Pending, failed, and refunded rows do not count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn has_completed_purchase(
        &self,
        user_id: Uuid,
        product_id: &str,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM purchases
            WHERE user_id = $1 AND product_id = $2 AND status = 'completed'
            ",
        )
        .bind(user_id.to_string())
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check purchase access: {e}")))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    /// List all purchases for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_purchases(&self, user_id: Uuid) -> AppResult<Vec<Purchase>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, product_id, amount, currency, status, stripe_session_id, purchased_at
            FROM purchases
            WHERE user_id = $1
            ORDER BY purchased_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list purchases: {e}")))?;

        rows.iter().map(row_to_purchase).collect()
    }

    /// Look up a purchase by its Stripe checkout session id. Webhook
    /// redelivery uses this to avoid inserting the same purchase twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_by_session_id(&self, session_id: &str) -> AppResult<Option<Purchase>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, product_id, amount, currency, status, stripe_session_id, purchased_at
            FROM purchases
            WHERE stripe_session_id = $1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get purchase by session: {e}")))?;

        row.as_ref().map(row_to_purchase).transpose()
    }

    /// Update the status of an existing purchase (refunds, failed payments)
    ///
    /// # Errors
    ///
    /// Returns an error if the purchase does not exist or the update fails
    pub async fn update_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE purchases SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(purchase_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update purchase status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Purchase {purchase_id} not found"
            )));
        }
        Ok(())
    }
}

fn row_to_purchase(row: &SqliteRow) -> AppResult<Purchase> {
    let status_str: String = row.get("status");
    let status = PurchaseStatus::parse(&status_str)
        .ok_or_else(|| AppError::database(format!("Unknown purchase status: {status_str}")))?;

    Ok(Purchase {
        id: parse_uuid("id", &row.get::<String, _>("id"))?,
        user_id: parse_uuid("user_id", &row.get::<String, _>("user_id"))?,
        product_id: row.get("product_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status,
        stripe_session_id: row.get("stripe_session_id"),
        purchased_at: parse_timestamp("purchased_at", &row.get::<String, _>("purchased_at"))?,
    })
}
