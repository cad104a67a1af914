// ABOUTME: AI chat completion backend for the recovery coach
// ABOUTME: Trait-based so route tests can swap in a canned backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use crate::config::ChatBackendConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One turn in a coach conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

/// System prompt prepended to every coach conversation
const COACH_SYSTEM_PROMPT: &str = "You are a compassionate recovery coach. \
You offer encouragement and practical next steps grounded in the member's \
own goals. You are not a therapist and you say so when asked for clinical \
advice.";

/// Chat completion backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the conversation and return the assistant reply
    async fn complete(&self, messages: &[ChatMessage]) -> AppResult<String>;
}

/// HTTP chat backend speaking the OpenAI-compatible completion shape
pub struct HttpChatBackend {
    client: Client,
    config: ChatBackendConfig,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

impl HttpChatBackend {
    /// Create a backend from configuration
    #[must_use]
    pub fn new(config: ChatBackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> AppResult<String> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(ChatMessage {
            role: "system".into(),
            content: COACH_SYSTEM_PROMPT.into(),
        });
        full_messages.extend(messages.iter().cloned());

        let request = CompletionRequest {
            model: &self.config.model,
            messages: full_messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Chat backend request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::external(format!(
                "Chat backend returned {status}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Invalid chat backend response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::external("Chat backend returned no choices".to_owned()))
    }
}
