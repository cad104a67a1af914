// ABOUTME: ConvertKit email marketing API client
// ABOUTME: Subscriptions are best-effort; callers never fail their primary flow on errors here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::config::ConvertKitConfig;
use crate::errors::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// ConvertKit API client
pub struct ConvertKitClient {
    client: Client,
    config: ConvertKitConfig,
}

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    api_key: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<&'a str>>,
}

impl ConvertKitClient {
    /// Create a client from configuration
    #[must_use]
    pub fn new(config: ConvertKitConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// True when credentials are configured; without them all calls are
    /// skipped silently (local development)
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.form_id.is_empty()
    }

    /// Add an email to the configured form
    ///
    /// # Errors
    ///
    /// Returns an error when the API call fails or returns a non-success
    /// status
    pub async fn subscribe(
        &self,
        email: &str,
        first_name: Option<&str>,
        tag: Option<&str>,
    ) -> AppResult<()> {
        if !self.is_configured() {
            return Ok(());
        }

        let request = SubscribeRequest {
            api_key: &self.config.api_key,
            email,
            first_name,
            tags: tag.map(|t| vec![t]),
        };

        let response = self
            .client
            .post(format!(
                "{}/forms/{}/subscribe",
                self.config.base_url, self.config.form_id
            ))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("ConvertKit request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::external(format!(
                "ConvertKit returned {status}"
            )));
        }
        Ok(())
    }

    /// Subscribe without letting a failure reach the caller. Used wherever
    /// the email list is a side effect of a purchase or download.
    pub async fn subscribe_best_effort(&self, email: &str, name: Option<&str>, tag: Option<&str>) {
        if let Err(e) = self.subscribe(email, name, tag).await {
            warn!("ConvertKit subscription failed for {email}: {e}");
        }
    }
}
