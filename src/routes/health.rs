// ABOUTME: Liveness endpoint for load balancers and uptime checks
// ABOUTME: Returns static JSON; no database round trip
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Build the health router
    #[must_use]
    pub fn routes() -> Router {
        Router::new().route("/api/health", get(Self::health))
    }

    async fn health() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
