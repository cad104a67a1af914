// ABOUTME: Shared server state handed to every route module behind an Arc
// ABOUTME: Owns the database pool, auth service, config, and external clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::auth::AuthService;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::external::{ChatBackend, ConvertKitClient, HttpChatBackend, StripeClient};
use std::sync::Arc;

/// Everything route handlers need, shared via `Arc<ServerResources>`
pub struct ServerResources {
    /// Database pool wrapper
    pub database: Database,
    /// Session token and password service
    pub auth: AuthService,
    /// Server configuration
    pub config: ServerConfig,
    /// Payment provider client
    pub stripe: StripeClient,
    /// Email marketing client
    pub convertkit: ConvertKitClient,
    /// AI coach completion backend
    pub chat_backend: Arc<dyn ChatBackend>,
}

impl ServerResources {
    /// Assemble resources from a connected database and loaded config
    #[must_use]
    pub fn new(database: Database, config: ServerConfig) -> Self {
        let auth = AuthService::new(&config.jwt_secret, config.jwt_expiry_hours);
        let stripe = StripeClient::new(config.stripe.clone());
        let convertkit = ConvertKitClient::new(config.convertkit.clone());
        let chat_backend: Arc<dyn ChatBackend> =
            Arc::new(HttpChatBackend::new(config.chat_backend.clone()));

        Self {
            database,
            auth,
            config,
            stripe,
            convertkit,
            chat_backend,
        }
    }

    /// Replace the chat backend, used by tests to avoid network calls
    #[must_use]
    pub fn with_chat_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.chat_backend = backend;
        self
    }
}
