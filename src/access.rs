// ABOUTME: Access gate for purchase-gated course content
// ABOUTME: Access is a live query against the purchase ledger, never cached
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::database::PurchasesManager;
use crate::errors::{AppError, AppResult};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Decides whether a user may see a product's content. A purchase grants
/// access only while its status is `completed`; a refund revokes access on
/// the next check with no separate revocation step.
pub struct AccessGate {
    purchases: PurchasesManager,
}

impl AccessGate {
    /// Create a new access gate
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self {
            purchases: PurchasesManager::new(pool),
        }
    }

    /// True iff the user holds a completed purchase for the product
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger query fails
    pub async fn check_access(&self, user_id: Uuid, product_id: &str) -> AppResult<bool> {
        self.purchases
            .has_completed_purchase(user_id, product_id)
            .await
    }

    /// Fail closed with Forbidden when the user lacks access
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when access is denied, or a database error if the
    /// ledger query fails
    pub async fn require_access(&self, user_id: Uuid, product_id: &str) -> AppResult<()> {
        if self.check_access(user_id, product_id).await? {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "No completed purchase for {product_id}"
            )))
        }
    }
}
