// ABOUTME: Gated course content, lesson progress, and purchase listing endpoints
// ABOUTME: Every content and progress operation re-checks the access gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::access::AccessGate;
use crate::database::progress::progress_percentage;
use crate::database::{CoursesManager, ProgressManager, PurchasesManager};
use crate::errors::AppError;
use crate::models::{CourseLesson, CourseModule, Purchase};
use crate::resources::ServerResources;
use crate::routes::authenticate;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A module with its lessons, in display order
#[derive(Debug, Serialize)]
pub struct ModuleContent {
    /// Module metadata
    #[serde(flatten)]
    pub module: CourseModule,
    /// Lessons ordered by `sort_order`
    pub lessons: Vec<LessonContent>,
}

/// A lesson with the caller's completion state
#[derive(Debug, Serialize)]
pub struct LessonContent {
    /// Lesson metadata
    #[serde(flatten)]
    pub lesson: CourseLesson,
    /// Whether the caller has completed this lesson
    pub completed: bool,
}

/// Full course content response
#[derive(Debug, Serialize)]
pub struct CourseContentResponse {
    /// Product slug
    pub product_id: String,
    /// Modules ordered by `sort_order`
    pub modules: Vec<ModuleContent>,
}

/// Aggregate progress response, derived fresh on every call
#[derive(Debug, Serialize)]
pub struct CourseProgressResponse {
    /// Product slug
    pub product_id: String,
    /// Lessons the caller has completed
    pub completed_lessons: i64,
    /// Total lessons across all modules of the product
    pub total_lessons: i64,
    /// Whole-number percentage, 0 when the course has no lessons
    pub progress_percent: u8,
    /// Ids of the completed lessons
    pub completed_lesson_ids: Vec<Uuid>,
}

/// Access check response
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    /// Product slug
    pub product_id: String,
    /// Whether the caller holds a completed purchase
    pub has_access: bool,
}

/// Members area routes
pub struct MembersRoutes;

impl MembersRoutes {
    /// Build the members router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/members/purchases", get(Self::list_purchases))
            .route("/api/members/:product_id/access", get(Self::check_access))
            .route("/api/members/:product_id/content", get(Self::course_content))
            .route(
                "/api/members/:product_id/progress",
                get(Self::course_progress),
            )
            .route(
                "/api/members/lessons/:lesson_id/complete",
                post(Self::mark_lesson_complete),
            )
            .with_state(resources)
    }

    async fn list_purchases(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<Vec<Purchase>>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let purchases = PurchasesManager::new(resources.database.pool().clone());
        Ok(Json(purchases.list_purchases(auth.user_id).await?))
    }

    async fn check_access(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(product_id): Path<String>,
    ) -> Result<Json<AccessResponse>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let gate = AccessGate::new(resources.database.pool().clone());
        let has_access = gate.check_access(auth.user_id, &product_id).await?;
        Ok(Json(AccessResponse {
            product_id,
            has_access,
        }))
    }

    async fn course_content(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(product_id): Path<String>,
    ) -> Result<Json<CourseContentResponse>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        let gate = AccessGate::new(resources.database.pool().clone());
        gate.require_access(auth.user_id, &product_id).await?;

        let courses = CoursesManager::new(resources.database.pool().clone());
        let progress = ProgressManager::new(resources.database.pool().clone());

        let completed: HashSet<Uuid> = progress
            .completed_lesson_ids(auth.user_id, &product_id)
            .await?
            .into_iter()
            .collect();

        let mut modules = Vec::new();
        for module in courses.list_modules(&product_id).await? {
            let lessons = courses
                .list_lessons(module.id)
                .await?
                .into_iter()
                .map(|lesson| LessonContent {
                    completed: completed.contains(&lesson.id),
                    lesson,
                })
                .collect();
            modules.push(ModuleContent { module, lessons });
        }

        Ok(Json(CourseContentResponse {
            product_id,
            modules,
        }))
    }

    async fn course_progress(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(product_id): Path<String>,
    ) -> Result<Json<CourseProgressResponse>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        let gate = AccessGate::new(resources.database.pool().clone());
        gate.require_access(auth.user_id, &product_id).await?;

        let courses = CoursesManager::new(resources.database.pool().clone());
        let progress = ProgressManager::new(resources.database.pool().clone());

        let total = courses.count_lessons(&product_id).await?;
        let completed_ids = progress
            .completed_lesson_ids(auth.user_id, &product_id)
            .await?;
        let completed = completed_ids.len() as i64;

        Ok(Json(CourseProgressResponse {
            product_id,
            completed_lessons: completed,
            total_lessons: total,
            progress_percent: progress_percentage(completed, total),
            completed_lesson_ids: completed_ids,
        }))
    }

    async fn mark_lesson_complete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(lesson_id): Path<Uuid>,
    ) -> Result<Json<CourseProgressResponse>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        let courses = CoursesManager::new(resources.database.pool().clone());
        let (_, product_id) = courses
            .get_lesson_with_product(lesson_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Lesson {lesson_id} not found")))?;

        // Fail closed: completing a lesson requires the same access as
        // viewing it
        let gate = AccessGate::new(resources.database.pool().clone());
        gate.require_access(auth.user_id, &product_id).await?;

        let progress = ProgressManager::new(resources.database.pool().clone());
        progress
            .mark_lesson_complete(auth.user_id, lesson_id, &product_id)
            .await?;

        info!("User {} completed lesson {lesson_id}", auth.user_id);

        let total = courses.count_lessons(&product_id).await?;
        let completed_ids = progress
            .completed_lesson_ids(auth.user_id, &product_id)
            .await?;
        let completed = completed_ids.len() as i64;

        Ok(Json(CourseProgressResponse {
            product_id,
            completed_lessons: completed,
            total_lessons: total,
            progress_percent: progress_percentage(completed, total),
            completed_lesson_ids: completed_ids,
        }))
    }
}
