// ABOUTME: Stripe checkout session creation and webhook handling
// ABOUTME: Webhook signatures are HMAC-SHA256 over "timestamp.payload", verified constant-time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::catalog::Product;
use crate::config::StripeConfig;
use crate::errors::{AppError, AppResult};
use reqwest::Client;
use ring::hmac;
use serde::Deserialize;
use std::time::Duration;

/// Accepted clock skew between the signature timestamp and now
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A created checkout session. The caller redirects the buyer to `url`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session id, later echoed by the webhook
    pub id: String,
    /// Hosted checkout URL
    pub url: String,
}

/// A verified, parsed webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Unique event id, used for redelivery dedup
    pub id: String,
    /// Event type, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload
    pub data: WebhookEventData,
}

/// The `data` envelope of a webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The object the event describes
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Parse a webhook body. The signature must already be verified.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a well-formed event
    pub fn parse(payload: &str) -> AppResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| AppError::invalid_input(format!("Malformed webhook payload: {e}")))
    }

    /// Customer email, wherever this event type carries it
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        let object = &self.data.object;
        object
            .pointer("/customer_details/email")
            .or_else(|| object.pointer("/customer_email"))
            .and_then(serde_json::Value::as_str)
    }

    /// Customer name from checkout session details
    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        self.data
            .object
            .pointer("/customer_details/name")
            .and_then(serde_json::Value::as_str)
    }

    /// `metadata.product_id`, set when we created the checkout session
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        self.data
            .object
            .pointer("/metadata/product_id")
            .and_then(serde_json::Value::as_str)
    }

    /// Amount in cents (`amount_total` on sessions, `amount_paid` on invoices)
    #[must_use]
    pub fn amount(&self) -> Option<i64> {
        let object = &self.data.object;
        object
            .pointer("/amount_total")
            .or_else(|| object.pointer("/amount_paid"))
            .and_then(serde_json::Value::as_i64)
    }

    /// The object id (session id or invoice id)
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data
            .object
            .pointer("/id")
            .and_then(serde_json::Value::as_str)
    }

    /// `billing_reason` on invoice events
    #[must_use]
    pub fn billing_reason(&self) -> Option<&str> {
        self.data
            .object
            .pointer("/billing_reason")
            .and_then(serde_json::Value::as_str)
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>,v1=<hex hmac>`; the signed message
/// is `<t>.<body>`. `now` is injectable for tests.
///
/// # Errors
///
/// Returns an error when the header is malformed, the timestamp is outside
/// tolerance, or the signature does not match
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
    now_unix: i64,
) -> AppResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut signature_hex: Option<&str> = None;

    for part in signature_header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => timestamp = v.parse().ok(),
            (Some("v1"), Some(v)) => signature_hex = Some(v),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::auth_invalid("Missing timestamp in webhook signature"))?;
    let signature_hex = signature_hex
        .ok_or_else(|| AppError::auth_invalid("Missing v1 signature in webhook signature"))?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::auth_invalid(
            "Webhook signature timestamp outside tolerance",
        ));
    }

    let signature = hex::decode(signature_hex)
        .map_err(|e| AppError::auth_invalid(format!("Invalid signature encoding: {e}")))?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, webhook_secret.as_bytes());
    let signed_payload = format!("{timestamp}.{payload}");

    hmac::verify(&key, signed_payload.as_bytes(), &signature)
        .map_err(|_| AppError::auth_invalid("Webhook signature mismatch"))
}

/// Stripe API client
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a client from configuration
    #[must_use]
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Webhook signing secret for this endpoint
    #[must_use]
    pub fn webhook_secret(&self) -> &str {
        &self.config.webhook_secret
    }

    /// Create a hosted checkout session for a product. Inline price data is
    /// used instead of pre-created prices, with the product slug carried in
    /// session metadata so the webhook can attribute the purchase.
    ///
    /// # Errors
    ///
    /// Returns an error when the API call fails or returns a non-success
    /// status
    pub async fn create_checkout_session(
        &self,
        product: &Product,
        customer_email: Option<&str>,
        app_url: &str,
    ) -> AppResult<CheckoutSession> {
        let mode = if product.recurring {
            "subscription"
        } else {
            "payment"
        };

        let amount = product.amount_cents.to_string();
        let mut form: Vec<(&str, String)> = vec![
            ("mode", mode.to_owned()),
            ("success_url", format!("{app_url}/thank-you?product={}", product.id)),
            ("cancel_url", format!("{app_url}/products/{}", product.id)),
            ("metadata[product_id]", product.id.to_owned()),
            ("line_items[0][quantity]", "1".to_owned()),
            ("line_items[0][price_data][currency]", "usd".to_owned()),
            ("line_items[0][price_data][unit_amount]", amount),
            (
                "line_items[0][price_data][product_data][name]",
                product.name.to_owned(),
            ),
        ];
        if product.recurring {
            form.push((
                "line_items[0][price_data][recurring][interval]",
                "month".to_owned(),
            ));
        }
        if let Some(email) = customer_email {
            form.push(("customer_email", email.to_owned()));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Stripe request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "Stripe returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Invalid Stripe response: {e}")))
    }
}
