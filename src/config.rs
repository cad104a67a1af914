// ABOUTME: Environment-driven server configuration
// ABOUTME: All settings come from environment variables with sensible defaults for development
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::errors::{AppError, AppResult};
use std::env;

/// Complete server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Database connection URL (sqlite file or `sqlite::memory:`)
    pub database_url: String,
    /// Secret used to sign session tokens
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Public base URL of the web app (checkout redirects)
    pub app_url: String,
    /// Payment provider settings
    pub stripe: StripeConfig,
    /// Email provider settings
    pub convertkit: ConvertKitConfig,
    /// AI chat backend settings
    pub chat_backend: ChatBackendConfig,
}

/// Stripe API and webhook configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key
    pub secret_key: String,
    /// Webhook endpoint signing secret
    pub webhook_secret: String,
    /// API base URL, overridable for tests
    pub base_url: String,
}

/// ConvertKit email provider configuration
#[derive(Debug, Clone)]
pub struct ConvertKitConfig {
    /// API key
    pub api_key: String,
    /// Form ID that new subscribers are added to
    pub form_id: String,
    /// API base URL, overridable for tests
    pub base_url: String,
}

/// AI chat backend configuration
#[derive(Debug, Clone)]
pub struct ChatBackendConfig {
    /// Chat completion endpoint URL
    pub base_url: String,
    /// Bearer token for the chat backend
    pub api_key: String,
    /// Model identifier passed through to the backend
    pub model: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable fails to parse or if
    /// `JWT_SECRET` is missing outside of development defaults.
    pub fn from_env() -> AppResult<Self> {
        let http_port = env_or("HTTP_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| AppError::config(format!("Invalid HTTP_PORT: {e}")))?;

        let jwt_expiry_hours = env_or("JWT_EXPIRY_HOURS", "24")
            .parse::<i64>()
            .map_err(|e| AppError::config(format!("Invalid JWT_EXPIRY_HOURS: {e}")))?;

        Ok(Self {
            http_port,
            database_url: env_or("DATABASE_URL", "sqlite:./data/stillwater.db"),
            jwt_secret: env_or("JWT_SECRET", "dev-only-secret-change-me"),
            jwt_expiry_hours,
            app_url: env_or("APP_URL", "http://localhost:3000"),
            stripe: StripeConfig {
                secret_key: env_or("STRIPE_SECRET_KEY", ""),
                webhook_secret: env_or("STRIPE_WEBHOOK_SECRET", ""),
                base_url: env_or("STRIPE_BASE_URL", "https://api.stripe.com/v1"),
            },
            convertkit: ConvertKitConfig {
                api_key: env_or("CONVERTKIT_API_KEY", ""),
                form_id: env_or("CONVERTKIT_FORM_ID", ""),
                base_url: env_or("CONVERTKIT_BASE_URL", "https://api.convertkit.com/v3"),
            },
            chat_backend: ChatBackendConfig {
                base_url: env_or("CHAT_BACKEND_URL", "https://api.openai.com/v1"),
                api_key: env_or("CHAT_BACKEND_API_KEY", ""),
                model: env_or("CHAT_BACKEND_MODEL", "gpt-4o-mini"),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
