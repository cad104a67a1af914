// ABOUTME: AI coach usage tier policy: caps, tier classification, remaining allowance
// ABOUTME: Pure logic; the persisted counter lives in database::coach_usage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::models::CoachUsage;
use serde::{Deserialize, Serialize};

/// Messages an anonymous visitor may send. Enforced client-side; the server
/// publishes the value so clients stay in sync.
pub const ANONYMOUS_MESSAGE_LIMIT: i64 = 3;

/// Cumulative messages a registered email may send, counting the anonymous
/// messages carried over at registration.
pub const REGISTERED_MESSAGE_LIMIT: i64 = 10;

/// Usage tier of a coach caller. Transitions are one-directional:
/// anonymous to registered, registered to unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageTier {
    /// No email registered; the browser tracks the count
    Anonymous,
    /// Email registered; the server tracks the count
    Registered,
    /// Purchased unlimited coach access
    Unlimited,
}

/// Snapshot of a caller's allowance, returned alongside coach responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachUsageStatus {
    /// Caller tier
    pub tier: UsageTier,
    /// Completed exchanges counted so far
    pub message_count: i64,
    /// Whether the next message would exceed the cap
    pub is_limited: bool,
    /// Cap for the tier; `None` for unlimited
    pub limit: Option<i64>,
    /// Messages left before the cap; `None` for unlimited
    pub remaining: Option<i64>,
}

impl CoachUsageStatus {
    /// Status for a server-tracked meter row
    #[must_use]
    pub fn from_usage(usage: &CoachUsage) -> Self {
        if usage.has_unlimited_access {
            return Self {
                tier: UsageTier::Unlimited,
                message_count: usage.message_count,
                is_limited: false,
                limit: None,
                remaining: None,
            };
        }

        Self {
            tier: UsageTier::Registered,
            message_count: usage.message_count,
            is_limited: usage.message_count >= REGISTERED_MESSAGE_LIMIT,
            limit: Some(REGISTERED_MESSAGE_LIMIT),
            remaining: Some(REGISTERED_MESSAGE_LIMIT.saturating_sub(usage.message_count).max(0)),
        }
    }

    /// Status for an anonymous caller reporting its client-side count
    #[must_use]
    pub fn anonymous(message_count: i64) -> Self {
        Self {
            tier: UsageTier::Anonymous,
            message_count,
            is_limited: message_count >= ANONYMOUS_MESSAGE_LIMIT,
            limit: Some(ANONYMOUS_MESSAGE_LIMIT),
            remaining: Some(ANONYMOUS_MESSAGE_LIMIT.saturating_sub(message_count).max(0)),
        }
    }
}
