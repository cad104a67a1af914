// ABOUTME: Shared test utilities: in-memory resources, seeded courses, request helper
// ABOUTME: The chat backend is swapped for a canned implementation; no network in tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use stillwater_server::config::{
    ChatBackendConfig, ConvertKitConfig, ServerConfig, StripeConfig,
};
use stillwater_server::database::{CoursesManager, Database, UsersManager};
use stillwater_server::errors::{AppError, AppResult};
use stillwater_server::external::{ChatBackend, ChatMessage};
use stillwater_server::models::{CourseLesson, CourseModule, User};
use stillwater_server::resources::ServerResources;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Chat backend that returns a fixed reply without any network call
pub struct CannedChatBackend {
    pub reply: String,
}

#[async_trait]
impl ChatBackend for CannedChatBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> AppResult<String> {
        Ok(self.reply.clone())
    }
}

/// Chat backend that always fails, for exchange-counting tests
pub struct FailingChatBackend;

#[async_trait]
impl ChatBackend for FailingChatBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> AppResult<String> {
        Err(AppError::external("backend unavailable"))
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_owned(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
        jwt_expiry_hours: 24,
        app_url: "http://localhost:3000".to_owned(),
        stripe: StripeConfig {
            secret_key: String::new(),
            webhook_secret: TEST_WEBHOOK_SECRET.to_owned(),
            base_url: "http://127.0.0.1:1".to_owned(),
        },
        convertkit: ConvertKitConfig {
            // Unconfigured: all ConvertKit calls are skipped
            api_key: String::new(),
            form_id: String::new(),
            base_url: "http://127.0.0.1:1".to_owned(),
        },
        chat_backend: ChatBackendConfig {
            base_url: "http://127.0.0.1:1".to_owned(),
            api_key: String::new(),
            model: "test-model".to_owned(),
        },
    }
}

/// In-memory server resources with a canned chat backend
pub async fn create_test_resources() -> Arc<ServerResources> {
    create_test_resources_with_backend(Arc::new(CannedChatBackend {
        reply: "You are doing better than you think.".to_owned(),
    }))
    .await
}

pub async fn create_test_resources_with_backend(
    backend: Arc<dyn ChatBackend>,
) -> Arc<ServerResources> {
    let database = Database::new("sqlite::memory:").await.unwrap();
    let resources = ServerResources::new(database, test_config()).with_chat_backend(backend);
    Arc::new(resources)
}

/// Create a user and return it with a valid bearer token
pub async fn create_test_user(resources: &ServerResources, email: &str) -> (User, String) {
    let users = UsersManager::new(resources.database.pool().clone());
    let user = users
        .create_user(email, Some("Test Member"), Some("hash"))
        .await
        .unwrap();
    let token = resources.auth.issue_token(&user).unwrap();
    (user, token)
}

/// Seed a course with one module per entry in `lessons_per_module`.
/// Returns lesson ids in display order.
pub async fn seed_course(
    resources: &ServerResources,
    product_id: &str,
    lessons_per_module: &[usize],
) -> Vec<Uuid> {
    let courses = CoursesManager::new(resources.database.pool().clone());
    let mut lesson_ids = Vec::new();

    for (module_idx, lesson_count) in lessons_per_module.iter().enumerate() {
        let module = CourseModule {
            id: Uuid::new_v4(),
            product_id: product_id.to_owned(),
            module_number: module_idx as i64 + 1,
            title: format!("Module {}", module_idx + 1),
            description: None,
            unlock_day: module_idx as i64 * 7,
            sort_order: module_idx as i64,
        };
        courses.create_module(&module).await.unwrap();

        for lesson_idx in 0..*lesson_count {
            let lesson = CourseLesson {
                id: Uuid::new_v4(),
                module_id: module.id,
                lesson_number: lesson_idx as i64 + 1,
                title: format!("Lesson {}.{}", module_idx + 1, lesson_idx + 1),
                description: None,
                video_url: Some("https://videos.example.com/test.mp4".to_owned()),
                workbook_url: None,
                duration_seconds: Some(300),
                sort_order: lesson_idx as i64,
            };
            courses.create_lesson(&lesson).await.unwrap();
            lesson_ids.push(lesson.id);
        }
    }

    lesson_ids
}

/// Drive a router with one request and return status plus parsed JSON body
pub async fn send_request(
    router: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
