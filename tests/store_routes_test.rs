// ABOUTME: Route-level tests for the store: webhook ingestion, newsletter, lead magnets
// ABOUTME: Webhook requests are signed with the test secret; ConvertKit stays unconfigured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{create_test_resources, send_request, TEST_WEBHOOK_SECRET};
use ring::hmac;
use serde_json::{json, Value};
use stillwater_server::database::{CoachUsageManager, MarketingManager, PurchasesManager, UsersManager};
use stillwater_server::models::PurchaseStatus;
use stillwater_server::routes::StoreRoutes;
use tower::ServiceExt;

fn stripe_signature(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
}

async fn post_webhook(router: &axum::Router, payload: &str, signature: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/store/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload.to_owned()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn checkout_event(event_id: &str, email: &str, product_id: &str, amount: i64) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_test_1",
            "amount_total": amount,
            "customer_details": {"email": email, "name": "Test Buyer"},
            "metadata": {"product_id": product_id}
        }}
    })
    .to_string()
}

#[tokio::test]
async fn checkout_webhook_creates_user_and_completed_purchase() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = checkout_event("evt_1", "buyer@example.com", "7-day-reset", 2700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);

    let (status, body) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .get_user_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    let list = purchases.list_purchases(user.id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].product_id, "7-day-reset");
    assert_eq!(list[0].amount, 2700);
    assert_eq!(list[0].status, PurchaseStatus::Completed);
}

#[tokio::test]
async fn redelivered_webhook_is_processed_once() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = checkout_event("evt_dup", "buyer@example.com", "7-day-reset", 2700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);

    let (first, _) = post_webhook(&router, &payload, &signature).await;
    let (second, body) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["duplicate"], true);

    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .get_user_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();
    let purchases = PurchasesManager::new(resources.database.pool().clone());
    assert_eq!(purchases.list_purchases(user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_webhook_is_reprocessed_on_redelivery() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = checkout_event("evt_retry", "buyer@example.com", "from-broken-to-whole", 9700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);

    // First delivery fails mid-processing: the purchase insert hits a
    // missing table and the handler must report the failure to Stripe
    sqlx::query("ALTER TABLE purchases RENAME TO purchases_offline")
        .execute(resources.database.pool())
        .await
        .unwrap();
    let (first, _) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);
    sqlx::query("ALTER TABLE purchases_offline RENAME TO purchases")
        .execute(resources.database.pool())
        .await
        .unwrap();

    // Redelivery must run the handlers, not be skipped as a duplicate
    let (second, body) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(second, StatusCode::OK);
    assert_ne!(body["duplicate"], true);

    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .get_user_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();
    let purchases = PurchasesManager::new(resources.database.pool().clone());
    let list = purchases.list_purchases(user.id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].status, PurchaseStatus::Completed);

    let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
    let usage = usage_mgr
        .get_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(usage.has_unlimited_access);
}

#[tokio::test]
async fn retried_webhook_does_not_duplicate_an_existing_purchase() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    // A previous delivery got as far as the purchase insert before failing,
    // so the session already has a row but no payment_events record
    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .find_or_create_by_email("buyer@example.com", Some("Test Buyer"))
        .await
        .unwrap();
    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(
            user.id,
            "from-broken-to-whole",
            9700,
            "usd",
            PurchaseStatus::Completed,
            Some("cs_test_1"),
        )
        .await
        .unwrap();

    let payload = checkout_event("evt_partial", "buyer@example.com", "from-broken-to-whole", 9700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);
    let (status, _) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(status, StatusCode::OK);

    // The retry completes the remaining steps without a second purchase row
    assert_eq!(purchases.list_purchases(user.id).await.unwrap().len(), 1);
    let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
    let usage = usage_mgr
        .get_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(usage.has_unlimited_access);
}

#[tokio::test]
async fn course_purchase_grants_unlimited_coaching() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = checkout_event("evt_2", "buyer@example.com", "from-broken-to-whole", 9700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);
    post_webhook(&router, &payload, &signature).await;

    let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
    let usage = usage_mgr
        .get_by_email("buyer@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(usage.has_unlimited_access);
}

#[tokio::test]
async fn reset_purchase_does_not_grant_unlimited_coaching() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = checkout_event("evt_3", "buyer@example.com", "7-day-reset", 2700);
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);
    post_webhook(&router, &payload, &signature).await;

    let usage_mgr = CoachUsageManager::new(resources.database.pool().clone());
    assert!(usage_mgr
        .get_by_email("buyer@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn subscription_invoice_creates_circle_purchase() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = json!({
        "id": "evt_sub",
        "type": "invoice.payment_succeeded",
        "data": {"object": {
            "id": "in_test_1",
            "amount_paid": 2900,
            "customer_email": "circle@example.com",
            "billing_reason": "subscription_create"
        }}
    })
    .to_string();
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);
    let (status, _) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(status, StatusCode::OK);

    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .get_user_by_email("circle@example.com")
        .await
        .unwrap()
        .unwrap();
    let purchases = PurchasesManager::new(resources.database.pool().clone());
    let list = purchases.list_purchases(user.id).await.unwrap();
    assert_eq!(list[0].product_id, "bent-not-broken-circle");
}

#[tokio::test]
async fn renewal_invoices_are_ignored() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let payload = json!({
        "id": "evt_renewal",
        "type": "invoice.payment_succeeded",
        "data": {"object": {
            "id": "in_test_2",
            "amount_paid": 2900,
            "customer_email": "circle@example.com",
            "billing_reason": "subscription_cycle"
        }}
    })
    .to_string();
    let signature = stripe_signature(&payload, TEST_WEBHOOK_SECRET);
    let (status, _) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(status, StatusCode::OK);

    let users = UsersManager::new(resources.database.pool().clone());
    assert!(users
        .get_user_by_email("circle@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources);

    let payload = checkout_event("evt_bad", "buyer@example.com", "7-day-reset", 2700);
    let signature = stripe_signature(&payload, "whsec_wrong");

    let (status, _) = post_webhook(&router, &payload, &signature).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn newsletter_subscribe_is_idempotent() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources.clone());

    let body = json!({"email": "reader@example.com", "name": "Reader"});
    let (first, _) =
        send_request(&router, "POST", "/api/store/subscribe", None, Some(body.clone())).await;
    let (second, _) = send_request(&router, "POST", "/api/store/subscribe", None, Some(body)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);

    let marketing = MarketingManager::new(resources.database.pool().clone());
    assert!(marketing
        .get_subscriber("reader@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn lead_magnet_download_tracks_and_returns_file() {
    let resources = create_test_resources().await;
    let marketing = MarketingManager::new(resources.database.pool().clone());
    marketing
        .create_lead_magnet("grounding-guide", "Grounding Guide", "https://files.example.com/guide.pdf")
        .await
        .unwrap();

    let router = StoreRoutes::routes(resources.clone());
    let (status, body) = send_request(
        &router,
        "POST",
        "/api/store/lead-magnets/grounding-guide/download",
        None,
        Some(json!({"email": "reader@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_url"], "https://files.example.com/guide.pdf");

    let magnet = marketing
        .get_lead_magnet("grounding-guide")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(magnet.download_count, 1);
    // Download also subscribes the reader
    assert!(marketing
        .get_subscriber("reader@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn unknown_lead_magnet_is_not_found() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources);

    let (status, _) = send_request(
        &router,
        "POST",
        "/api/store/lead-magnets/missing/download",
        None,
        Some(json!({"email": "reader@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checkout_for_unknown_product_is_not_found() {
    let resources = create_test_resources().await;
    let router = StoreRoutes::routes(resources);

    let (status, _) = send_request(
        &router,
        "POST",
        "/api/store/checkout",
        None,
        Some(json!({"product_id": "no-such-product"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
