// ABOUTME: Route-level tests for the members area: gating, content, progress
// ABOUTME: Drives the real router with oneshot requests against in-memory SQLite
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::http::StatusCode;
use common::{create_test_resources, create_test_user, seed_course, send_request};
use stillwater_server::database::PurchasesManager;
use stillwater_server::models::PurchaseStatus;
use stillwater_server::routes::MembersRoutes;

const PRODUCT: &str = "from-broken-to-whole";

#[tokio::test]
async fn content_requires_authentication() {
    let resources = create_test_resources().await;
    let router = MembersRoutes::routes(resources);

    let (status, _) =
        send_request(&router, "GET", &format!("/api/members/{PRODUCT}/content"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn content_requires_a_completed_purchase() {
    let resources = create_test_resources().await;
    let (_, token) = create_test_user(&resources, "member@example.com").await;
    seed_course(&resources, PRODUCT, &[2]).await;
    let router = MembersRoutes::routes(resources);

    let (status, body) = send_request(
        &router,
        "GET",
        &format!("/api/members/{PRODUCT}/content"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn buyers_see_modules_and_lessons_in_order() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;
    seed_course(&resources, PRODUCT, &[3, 4]).await;

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let router = MembersRoutes::routes(resources);
    let (status, body) = send_request(
        &router,
        "GET",
        &format!("/api/members/{PRODUCT}/content"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let modules = body["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0]["title"], "Module 1");
    assert_eq!(modules[0]["lessons"].as_array().unwrap().len(), 3);
    assert_eq!(modules[1]["lessons"].as_array().unwrap().len(), 4);
    assert_eq!(modules[0]["lessons"][0]["completed"], false);
}

#[tokio::test]
async fn marking_lessons_updates_derived_progress() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;
    let lessons = seed_course(&resources, PRODUCT, &[3, 4]).await;

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let router = MembersRoutes::routes(resources);

    for lesson_id in lessons.iter().take(3) {
        let (status, _) = send_request(
            &router,
            "POST",
            &format!("/api/members/lessons/{lesson_id}/complete"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send_request(
        &router,
        "GET",
        &format!("/api/members/{PRODUCT}/progress"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed_lessons"], 3);
    assert_eq!(body["total_lessons"], 7);
    assert_eq!(body["progress_percent"], 43);
}

#[tokio::test]
async fn repeat_completion_does_not_inflate_progress() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;
    let lessons = seed_course(&resources, PRODUCT, &[2]).await;

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let router = MembersRoutes::routes(resources);
    let uri = format!("/api/members/lessons/{}/complete", lessons[0]);

    let (first_status, first) = send_request(&router, "POST", &uri, Some(&token), None).await;
    let (second_status, second) = send_request(&router, "POST", &uri, Some(&token), None).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["completed_lessons"], 1);
    assert_eq!(second["completed_lessons"], 1);
    assert_eq!(second["progress_percent"], 50);
}

#[tokio::test]
async fn marking_a_lesson_without_access_is_forbidden() {
    let resources = create_test_resources().await;
    let (_, token) = create_test_user(&resources, "member@example.com").await;
    let lessons = seed_course(&resources, PRODUCT, &[2]).await;

    let router = MembersRoutes::routes(resources);
    let (status, _) = send_request(
        &router,
        "POST",
        &format!("/api/members/lessons/{}/complete", lessons[0]),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refund_revokes_content_access() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;
    seed_course(&resources, PRODUCT, &[1]).await;

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    let purchase = purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let router = MembersRoutes::routes(resources);
    let uri = format!("/api/members/{PRODUCT}/content");

    let (status, _) = send_request(&router, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    purchases
        .update_status(purchase.id, PurchaseStatus::Refunded)
        .await
        .unwrap();

    let (status, _) = send_request(&router, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_course_reports_zero_percent() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let router = MembersRoutes::routes(resources);
    let (status, body) = send_request(
        &router,
        "GET",
        &format!("/api/members/{PRODUCT}/progress"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_lessons"], 0);
    assert_eq!(body["progress_percent"], 0);
}

#[tokio::test]
async fn access_endpoint_reflects_purchase_state() {
    let resources = create_test_resources().await;
    let (user, token) = create_test_user(&resources, "member@example.com").await;

    let router = MembersRoutes::routes(resources.clone());
    let uri = format!("/api/members/{PRODUCT}/access");

    let (status, body) = send_request(&router, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_access"], false);

    let purchases = PurchasesManager::new(resources.database.pool().clone());
    purchases
        .create_purchase(user.id, PRODUCT, 9700, "usd", PurchaseStatus::Completed, None)
        .await
        .unwrap();

    let (_, body) = send_request(&router, "GET", &uri, Some(&token), None).await;
    assert_eq!(body["has_access"], true);
}
