// ABOUTME: Registration, login, and current-session endpoints
// ABOUTME: Successful auth returns a bearer token and sets the session cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::auth::AuthService;
use crate::database::UsersManager;
use crate::errors::AppError;
use crate::models::User;
use crate::resources::ServerResources;
use crate::routes::authenticate;
use crate::security::session_cookie_header;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Email address
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Optional display name
    pub name: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Successful auth response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token for the Authorization header
    pub token: String,
    /// Authenticated user
    pub user: UserInfo,
}

/// Public view of a user account
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User id
    pub id: Uuid,
    /// Email address
    pub email: String,
    /// Display name, if set
    pub name: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Build the auth router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::register))
            .route("/api/auth/login", post(Self::login))
            .route("/api/auth/me", get(Self::me))
            .with_state(resources)
    }

    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<Response, AppError> {
        if !AuthService::is_valid_email(&request.email) {
            return Err(AppError::invalid_input("Invalid email address"));
        }
        if !AuthService::is_valid_password(&request.password) {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }

        let users = UsersManager::new(resources.database.pool().clone());

        // A purchase may have created a passwordless account for this email;
        // claim it instead of rejecting the signup.
        let password_hash = AuthService::hash_password(request.password).await?;
        let user = match users.get_user_by_email(&request.email).await? {
            Some(existing) if existing.password_hash.is_some() => {
                return Err(AppError::invalid_input("Email is already registered"));
            }
            Some(existing) => {
                Self::set_password(&resources, existing.id, &password_hash).await?;
                User {
                    password_hash: Some(password_hash),
                    ..existing
                }
            }
            None => {
                users
                    .create_user(&request.email, request.name.as_deref(), Some(&password_hash))
                    .await?
            }
        };

        info!("Registered user {}", user.id);
        Self::session_response(&resources, &user, StatusCode::CREATED)
    }

    async fn login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let users = UsersManager::new(resources.database.pool().clone());

        let user = users
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;

        let Some(hash) = user.password_hash.clone() else {
            return Err(AppError::auth_invalid("Invalid email or password"));
        };

        if !AuthService::verify_password(request.password, hash).await? {
            return Err(AppError::auth_invalid("Invalid email or password"));
        }

        users.touch_last_active(user.id).await?;
        Self::session_response(&resources, &user, StatusCode::OK)
    }

    async fn me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<UserInfo>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        let users = UsersManager::new(resources.database.pool().clone());
        let user = users
            .get_user(auth.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User account no longer exists"))?;

        Ok(Json(UserInfo::from(&user)))
    }

    async fn set_password(
        resources: &Arc<ServerResources>,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id.to_string())
            .execute(resources.database.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to set password: {e}")))?;
        Ok(())
    }

    fn session_response(
        resources: &Arc<ServerResources>,
        user: &User,
        status: StatusCode,
    ) -> Result<Response, AppError> {
        let token = resources.auth.issue_token(user)?;
        let max_age = resources.config.jwt_expiry_hours * 3600;
        let secure = !resources.config.app_url.starts_with("http://localhost");

        let body = Json(SessionResponse {
            token: token.clone(),
            user: UserInfo::from(user),
        });

        let mut response = (status, body).into_response();
        if let Some(cookie) = session_cookie_header(&token, max_age, secure) {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Ok(response)
    }
}
