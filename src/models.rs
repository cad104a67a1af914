// ABOUTME: Core domain records shared across database managers and route handlers
// ABOUTME: Purchases, course content, lesson progress, coach usage, and marketing records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Users
// ============================================================================

/// Registered user account. Accounts may be created by the user (signup)
/// or implicitly by a completed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,
    /// Email address (unique)
    pub email: String,
    /// Display name, if known
    pub name: Option<String>,
    /// Bcrypt hash; `None` for purchase-created accounts that never set a password
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Account creation time
    pub created_at: DateTime<Utc>,
    /// Last authenticated activity
    pub last_active: DateTime<Utc>,
}

// ============================================================================
// Purchases
// ============================================================================

/// Lifecycle state of a purchase. Only `Completed` grants content access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Checkout started, payment not confirmed
    Pending,
    /// Payment confirmed
    Completed,
    /// Payment failed
    Failed,
    /// Payment reversed
    Refunded,
}

impl PurchaseStatus {
    /// Database column representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parse the database column representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// A single purchase row. `product_id` is an ad hoc product slug such as
/// `"7-day-reset"`, not a foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique purchase ID
    pub id: Uuid,
    /// Buyer
    pub user_id: Uuid,
    /// Product slug
    pub product_id: String,
    /// Amount in cents
    pub amount: i64,
    /// ISO currency code
    pub currency: String,
    /// Lifecycle state
    pub status: PurchaseStatus,
    /// Stripe checkout session, when the purchase came through checkout
    pub stripe_session_id: Option<String>,
    /// Purchase time
    pub purchased_at: DateTime<Utc>,
}

// ============================================================================
// Course content
// ============================================================================

/// A module within a course product. Ordering is by `sort_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseModule {
    /// Unique module ID
    pub id: Uuid,
    /// Owning product slug
    pub product_id: String,
    /// Display number
    pub module_number: i64,
    /// Module title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Days after purchase the module is intended to unlock (advisory)
    pub unlock_day: i64,
    /// Sort key within the product
    pub sort_order: i64,
}

/// A lesson within a module. Ordering is by `sort_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseLesson {
    /// Unique lesson ID
    pub id: Uuid,
    /// Owning module
    pub module_id: Uuid,
    /// Display number
    pub lesson_number: i64,
    /// Lesson title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Video asset URL
    pub video_url: Option<String>,
    /// Workbook / worksheet URL
    pub workbook_url: Option<String>,
    /// Video length in seconds
    pub duration_seconds: Option<i64>,
    /// Sort key within the module
    pub sort_order: i64,
}

// ============================================================================
// Progress
// ============================================================================

/// A completed-lesson marker. At most one row per (user, lesson).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgress {
    /// Unique row ID
    pub id: Uuid,
    /// User who completed the lesson
    pub user_id: Uuid,
    /// Completed lesson
    pub lesson_id: Uuid,
    /// Product the lesson belongs to (denormalized for aggregate queries)
    pub product_id: String,
    /// Completion time (most recent completion on repeat marks)
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// Coach usage
// ============================================================================

/// Server-side usage meter row for the AI coach, keyed by email.
/// Exists independently of a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachUsage {
    /// Unique row ID
    pub id: Uuid,
    /// Meter key
    pub email: String,
    /// Completed exchanges counted so far
    pub message_count: i64,
    /// When true the cap never applies
    pub has_unlimited_access: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last increment or flag change
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Marketing
// ============================================================================

/// Newsletter subscriber row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSubscriber {
    /// Unique row ID
    pub id: Uuid,
    /// Subscriber email (unique)
    pub email: String,
    /// Optional name
    pub name: Option<String>,
    /// Where the subscription came from (footer form, lead magnet slug, purchase)
    pub source: Option<String>,
    /// Subscription time
    pub subscribed_at: DateTime<Utc>,
}

/// Downloadable lead magnet (free PDF, audio, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadMagnet {
    /// Unique row ID
    pub id: Uuid,
    /// URL slug
    pub slug: String,
    /// Display title
    pub title: String,
    /// Hosted file URL
    pub file_url: String,
    /// Total recorded downloads
    pub download_count: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
