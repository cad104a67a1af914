// ABOUTME: Checkout creation, Stripe webhook ingestion, newsletter, and lead magnets
// ABOUTME: Webhook processing is idempotent per event id; email side effects never block
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::auth::AuthService;
use crate::catalog::{self, FROM_BROKEN_TO_WHOLE};
use crate::database::{CoachUsageManager, MarketingManager, PurchasesManager, UsersManager};
use crate::errors::AppError;
use crate::external::stripe::verify_webhook_signature;
use crate::external::WebhookEvent;
use crate::models::PurchaseStatus;
use crate::resources::ServerResources;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Checkout request body
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Product slug to buy
    pub product_id: String,
    /// Buyer email, prefilled on the checkout page when known
    pub email: Option<String>,
}

/// Checkout response
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout URL to redirect to
    pub url: String,
    /// Session id
    pub session_id: String,
}

/// Newsletter subscribe request body
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    /// Subscriber email
    pub email: String,
    /// Optional name
    pub name: Option<String>,
}

/// Lead magnet download request body
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    /// Downloader email
    pub email: String,
    /// Optional name
    pub name: Option<String>,
}

/// Lead magnet download response
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    /// Hosted file URL
    pub file_url: String,
}

/// Store routes
pub struct StoreRoutes;

impl StoreRoutes {
    /// Build the store router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/store/checkout", post(Self::create_checkout))
            .route("/api/store/webhook", post(Self::stripe_webhook))
            .route("/api/store/subscribe", post(Self::subscribe))
            .route(
                "/api/store/lead-magnets/:slug/download",
                post(Self::download_lead_magnet),
            )
            .with_state(resources)
    }

    async fn create_checkout(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<CheckoutRequest>,
    ) -> Result<Json<CheckoutResponse>, AppError> {
        let product = catalog::get(&request.product_id).ok_or_else(|| {
            AppError::not_found(format!("Unknown product: {}", request.product_id))
        })?;

        let session = resources
            .stripe
            .create_checkout_session(product, request.email.as_deref(), &resources.config.app_url)
            .await?;

        info!("Created checkout session {} for {}", session.id, product.id);
        Ok(Json(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        }))
    }

    async fn stripe_webhook(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: String,
    ) -> Result<Json<Value>, AppError> {
        let signature = headers
            .get("stripe-signature")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::auth_invalid("Missing Stripe-Signature header"))?;

        verify_webhook_signature(
            &body,
            signature,
            resources.stripe.webhook_secret(),
            chrono::Utc::now().timestamp(),
        )?;

        let event = WebhookEvent::parse(&body)?;

        let marketing = MarketingManager::new(resources.database.pool().clone());
        if marketing.has_payment_event(&event.id).await? {
            info!("Skipping redelivered webhook event {}", event.id);
            return Ok(Json(json!({"received": true, "duplicate": true})));
        }

        match event.event_type.as_str() {
            "checkout.session.completed" => {
                Self::handle_checkout_completed(&resources, &event).await?;
            }
            "invoice.payment_succeeded" => {
                // Only the first invoice of a subscription creates a
                // purchase; renewals are ignored
                if event.billing_reason() == Some("subscription_create") {
                    Self::handle_subscription_created(&resources, &event).await?;
                }
            }
            other => {
                info!("Ignoring webhook event type {other}");
            }
        }

        // Recorded only after the handlers succeed. A processing failure
        // returns an error without a record, and Stripe's redelivery runs
        // the handlers again instead of being skipped as a duplicate.
        let first_record = marketing
            .record_payment_event(&event.id, &event.event_type, &body)
            .await?;
        if !first_record {
            info!("Webhook event {} recorded by a concurrent delivery", event.id);
        }

        Ok(Json(json!({"received": true})))
    }

    async fn handle_checkout_completed(
        resources: &Arc<ServerResources>,
        event: &WebhookEvent,
    ) -> Result<(), AppError> {
        let Some(email) = event.customer_email() else {
            warn!("Checkout event {} has no customer email", event.id);
            return Ok(());
        };
        let Some(product_id) = event.product_id() else {
            warn!("Checkout event {} has no product metadata", event.id);
            return Ok(());
        };

        let amount = event
            .amount()
            .or_else(|| catalog::get(product_id).map(|p| p.amount_cents))
            .unwrap_or(0);

        Self::record_completed_purchase(
            resources,
            email,
            event.customer_name(),
            product_id,
            amount,
            event.object_id(),
        )
        .await
    }

    async fn handle_subscription_created(
        resources: &Arc<ServerResources>,
        event: &WebhookEvent,
    ) -> Result<(), AppError> {
        let Some(email) = event.customer_email() else {
            warn!("Invoice event {} has no customer email", event.id);
            return Ok(());
        };

        let product = catalog::subscription_product();
        let amount = event.amount().unwrap_or(product.amount_cents);

        Self::record_completed_purchase(
            resources,
            email,
            None,
            product.id,
            amount,
            event.object_id(),
        )
        .await
    }

    async fn record_completed_purchase(
        resources: &Arc<ServerResources>,
        email: &str,
        name: Option<&str>,
        product_id: &str,
        amount: i64,
        session_id: Option<&str>,
    ) -> Result<(), AppError> {
        let users = UsersManager::new(resources.database.pool().clone());
        let purchases = PurchasesManager::new(resources.database.pool().clone());

        let user = users.find_or_create_by_email(email, name).await?;

        // A retried event may have written the purchase before failing on a
        // later step; look the session up so the retry does not insert twice
        let existing = match session_id {
            Some(sid) => purchases.get_by_session_id(sid).await?,
            None => None,
        };
        match existing {
            Some(purchase) => {
                info!(
                    "Purchase {} of {product_id} already recorded for user {}",
                    purchase.id, user.id
                );
            }
            None => {
                let purchase = purchases
                    .create_purchase(
                        user.id,
                        product_id,
                        amount,
                        "usd",
                        PurchaseStatus::Completed,
                        session_id,
                    )
                    .await?;
                info!(
                    "Recorded purchase {} of {product_id} for user {}",
                    purchase.id, user.id
                );
            }
        }

        // The course purchase includes unlimited coach access
        if product_id == FROM_BROKEN_TO_WHOLE {
            let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
            usage_mgr.grant_unlimited_access(email).await?;
        }

        resources
            .convertkit
            .subscribe_best_effort(email, name, Some("customer"))
            .await;

        Ok(())
    }

    async fn subscribe(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<SubscribeRequest>,
    ) -> Result<Json<Value>, AppError> {
        if !AuthService::is_valid_email(&request.email) {
            return Err(AppError::invalid_input("Invalid email address"));
        }

        let marketing = MarketingManager::new(resources.database.pool().clone());
        let subscriber = marketing
            .subscribe(&request.email, request.name.as_deref(), Some("newsletter"))
            .await?;

        resources
            .convertkit
            .subscribe_best_effort(&request.email, request.name.as_deref(), None)
            .await;

        Ok(Json(json!({
            "subscribed": true,
            "email": subscriber.email,
        })))
    }

    async fn download_lead_magnet(
        State(resources): State<Arc<ServerResources>>,
        Path(slug): Path<String>,
        Json(request): Json<DownloadRequest>,
    ) -> Result<Json<DownloadResponse>, AppError> {
        if !AuthService::is_valid_email(&request.email) {
            return Err(AppError::invalid_input("Invalid email address"));
        }

        let marketing = MarketingManager::new(resources.database.pool().clone());
        let magnet = marketing
            .get_lead_magnet(&slug)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Unknown lead magnet: {slug}")))?;

        marketing.record_download(magnet.id, &request.email).await?;
        marketing
            .subscribe(&request.email, request.name.as_deref(), Some(&slug))
            .await?;

        resources
            .convertkit
            .subscribe_best_effort(&request.email, request.name.as_deref(), Some(&slug))
            .await;

        Ok(Json(DownloadResponse {
            file_url: magnet.file_url,
        }))
    }
}
