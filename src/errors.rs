// ABOUTME: Unified application error type with HTTP response mapping
// ABOUTME: All fallible paths return AppResult and propagate with the ? operator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error. Each variant carries a human-readable message;
/// the variant determines the HTTP status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database query or connection failure
    #[error("Database error: {0}")]
    Database(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request payload or parameters failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication credentials missing or rejected
    #[error("Authentication failed: {0}")]
    AuthInvalid(String),

    /// Authenticated but not allowed to access the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Caller exhausted their usage allowance
    #[error("Usage limit reached: {0}")]
    UsageLimited(String),

    /// Server configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream service (payment, email, chat backend) failure
    #[error("External service error: {0}")]
    External(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Database query or connection failure
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Requested entity does not exist
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Request payload or parameters failed validation
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Authentication credentials missing or rejected
    pub fn auth_invalid(msg: impl Into<String>) -> Self {
        Self::AuthInvalid(msg.into())
    }

    /// Authenticated but not allowed to access the resource
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Caller exhausted their usage allowance
    pub fn usage_limited(msg: impl Into<String>) -> Self {
        Self::UsageLimited(msg.into())
    }

    /// Server configuration problem
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Upstream service failure
    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }

    /// Unexpected internal failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code included in error responses
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::AuthInvalid(_) => "auth_invalid",
            Self::Forbidden(_) => "forbidden",
            Self::UsageLimited(_) => "usage_limited",
            Self::Config(_) => "config_error",
            Self::External(_) => "external_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UsageLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("Record not found".into()),
            other => Self::Database(other.to_string()),
        }
    }
}
