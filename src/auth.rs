// ABOUTME: Session token issuing and verification plus password hashing
// ABOUTME: JWTs are HS256; passwords are bcrypt hashed on a blocking thread
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::errors::{AppError, AppResult};
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::task;
use uuid::Uuid;

/// JWT claims carried in session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
}

/// The authenticated caller, produced by token verification
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// User id from the token
    pub user_id: Uuid,
    /// Email from the token
    pub email: String,
}

/// Issues and verifies session tokens, hashes and checks passwords
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl AuthService {
    /// Create an auth service from the configured JWT secret
    #[must_use]
    pub fn new(jwt_secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a session token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode session token: {e}")))
    }

    /// Verify a bearer token and extract the caller identity
    ///
    /// # Errors
    ///
    /// Returns an error if the token is expired, malformed, or has a bad
    /// signature
    pub fn verify_token(&self, token: &str) -> AppResult<AuthResult> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::auth_invalid(format!("Invalid session token: {e}")))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| AppError::auth_invalid(format!("Invalid subject in token: {e}")))?;

        Ok(AuthResult {
            user_id,
            email: data.claims.email,
        })
    }

    /// Hash a password with bcrypt on a blocking thread
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails or the blocking task is cancelled
    pub async fn hash_password(password: String) -> AppResult<String> {
        task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
    }

    /// Verify a password against a stored hash on a blocking thread
    ///
    /// # Errors
    ///
    /// Returns an error if verification fails or the blocking task is
    /// cancelled
    pub async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
        task::spawn_blocking(move || bcrypt::verify(&password, &password_hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verify task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))
    }

    /// Validate email format
    #[must_use]
    pub fn is_valid_email(email: &str) -> bool {
        if email.len() <= 5 {
            return false;
        }
        let Some(at_pos) = email.find('@') else {
            return false;
        };
        if at_pos == 0 || at_pos == email.len() - 1 {
            return false;
        }
        let domain_part = &email[at_pos + 1..];
        domain_part.contains('.')
    }

    /// Validate password strength
    #[must_use]
    pub const fn is_valid_password(password: &str) -> bool {
        password.len() >= 8
    }
}
