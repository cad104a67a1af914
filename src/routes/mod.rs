// ABOUTME: HTTP route modules, one per domain, assembled in server.rs
// ABOUTME: Shared bearer-or-cookie authentication helper lives here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

/// Registration, login, and session info
pub mod auth;
/// AI coach messaging and usage metering
pub mod coach;
/// Liveness endpoint
pub mod health;
/// Gated course content and lesson progress
pub mod members;
/// Checkout, webhooks, newsletter, and lead magnets
pub mod store;

pub use auth::AuthRoutes;
pub use coach::CoachRoutes;
pub use health::HealthRoutes;
pub use members::MembersRoutes;
pub use store::StoreRoutes;

use crate::auth::AuthResult;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::security::{get_cookie_value, SESSION_COOKIE};
use axum::http::HeaderMap;
use std::sync::Arc;

/// Authenticate a request from its Authorization header or session cookie
pub(crate) fn authenticate(
    headers: &HeaderMap,
    resources: &Arc<ServerResources>,
) -> Result<AuthResult, AppError> {
    let token = if let Some(auth_header) = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
    {
        auth_header
            .strip_prefix("Bearer ")
            .unwrap_or(auth_header)
            .to_owned()
    } else if let Some(token) = get_cookie_value(headers, SESSION_COOKIE) {
        token
    } else {
        return Err(AppError::auth_invalid(
            "Missing authorization header or cookie",
        ));
    };

    resources.auth.verify_token(&token)
}
