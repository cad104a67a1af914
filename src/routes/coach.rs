// ABOUTME: AI coach endpoints: registration, usage status, and metered messaging
// ABOUTME: The counter records completed exchanges; a failed backend call costs nothing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::auth::AuthService;
use crate::database::CoachUsageManager;
use crate::errors::AppError;
use crate::external::ChatMessage;
use crate::resources::ServerResources;
use crate::usage::{CoachUsageStatus, ANONYMOUS_MESSAGE_LIMIT};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Register-email request body
#[derive(Debug, Deserialize)]
pub struct RegisterEmailRequest {
    /// Email to key the server-side meter by
    pub email: String,
    /// Messages already sent anonymously, carried into the server count
    #[serde(default = "default_initial_count")]
    pub initial_message_count: i64,
}

const fn default_initial_count() -> i64 {
    ANONYMOUS_MESSAGE_LIMIT
}

/// Usage status query
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Registered email
    pub email: String,
}

/// Coach message request body
#[derive(Debug, Deserialize)]
pub struct CoachMessageRequest {
    /// Registered email; `None` for anonymous callers
    pub email: Option<String>,
    /// Conversation so far, ending with the user's new message
    pub messages: Vec<ChatMessage>,
    /// Anonymous callers report their client-side count here
    #[serde(default)]
    pub anonymous_message_count: i64,
}

/// Coach message response
#[derive(Debug, Serialize)]
pub struct CoachMessageResponse {
    /// Assistant reply
    pub reply: String,
    /// Allowance after this exchange
    pub usage: CoachUsageStatus,
}

/// AI coach routes
pub struct CoachRoutes;

impl CoachRoutes {
    /// Build the coach router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/coach/register", post(Self::register_email))
            .route("/api/coach/usage", get(Self::usage_status))
            .route("/api/coach/message", post(Self::send_message))
            .with_state(resources)
    }

    /// Move an anonymous caller onto the server-side meter. Idempotent:
    /// an already registered email keeps its existing count.
    async fn register_email(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterEmailRequest>,
    ) -> Result<Json<CoachUsageStatus>, AppError> {
        if !AuthService::is_valid_email(&request.email) {
            return Err(AppError::invalid_input("Invalid email address"));
        }
        if request.initial_message_count < 0 {
            return Err(AppError::invalid_input(
                "initial_message_count must not be negative",
            ));
        }

        let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
        let carried = request.initial_message_count.min(ANONYMOUS_MESSAGE_LIMIT);
        let usage = usage_mgr.register_email(&request.email, carried).await?;

        info!("Coach email registered: {}", request.email);
        Ok(Json(CoachUsageStatus::from_usage(&usage)))
    }

    async fn usage_status(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<UsageQuery>,
    ) -> Result<Json<CoachUsageStatus>, AppError> {
        let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
        let usage = usage_mgr
            .get_by_email(&query.email)
            .await?
            .ok_or_else(|| AppError::not_found("Email is not registered with the coach"))?;

        Ok(Json(CoachUsageStatus::from_usage(&usage)))
    }

    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CoachMessageRequest>,
    ) -> Result<Json<CoachMessageResponse>, AppError> {
        if request.messages.is_empty() {
            return Err(AppError::invalid_input("messages must not be empty"));
        }

        match request.email {
            Some(email) => Self::registered_message(&resources, &email, &request.messages).await,
            None => {
                Self::anonymous_message(&resources, request.anonymous_message_count, &request.messages)
                    .await
            }
        }
    }

    async fn registered_message(
        resources: &Arc<ServerResources>,
        email: &str,
        messages: &[ChatMessage],
    ) -> Result<Json<CoachMessageResponse>, AppError> {
        let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());

        let usage = usage_mgr
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("Email is not registered with the coach"))?;

        let status = CoachUsageStatus::from_usage(&usage);
        if status.is_limited {
            return Err(AppError::usage_limited(
                "Message limit reached. Purchase the course for unlimited coaching.",
            ));
        }

        let reply = resources.chat_backend.complete(messages).await?;

        // The reply has already been produced; a lost increment must not
        // turn it into an error for the caller
        if let Err(e) = usage_mgr.increment_message_count(email).await {
            warn!("Failed to count coach exchange for {email}: {e}");
        }

        let usage_after = usage_mgr
            .get_by_email(email)
            .await?
            .map_or_else(|| CoachUsageStatus::from_usage(&usage), |u| CoachUsageStatus::from_usage(&u));

        Ok(Json(CoachMessageResponse {
            reply,
            usage: usage_after,
        }))
    }

    async fn anonymous_message(
        resources: &Arc<ServerResources>,
        reported_count: i64,
        messages: &[ChatMessage],
    ) -> Result<Json<CoachMessageResponse>, AppError> {
        // Anonymous callers carry their own count; the server only echoes
        // the limit back for clients that report it
        let status = CoachUsageStatus::anonymous(reported_count);
        if status.is_limited {
            return Err(AppError::usage_limited(
                "Free message limit reached. Register your email to continue.",
            ));
        }

        let reply = resources.chat_backend.complete(messages).await?;

        Ok(Json(CoachMessageResponse {
            reply,
            usage: CoachUsageStatus::anonymous(reported_count + 1),
        }))
    }
}
