// ABOUTME: Router assembly and the HTTP serve loop
// ABOUTME: All route modules are merged onto one router with tracing and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::routes::{AuthRoutes, CoachRoutes, HealthRoutes, MembersRoutes, StoreRoutes};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Build the complete application router
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes())
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(MembersRoutes::routes(resources.clone()))
        .merge(CoachRoutes::routes(resources.clone()))
        .merge(StoreRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the configured port and serve until shutdown
///
/// # Errors
///
/// Returns an error if binding the listener or serving fails
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let port = resources.config.http_port;
    let router = build_router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind port {port}: {e}")))?;

    info!("Listening on port {port}");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}
