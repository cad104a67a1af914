// ABOUTME: Clients for external services: payments, email marketing, AI chat
// ABOUTME: Each client owns a reqwest::Client and its own config struct
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

/// AI chat completion backend
pub mod chat_backend;
/// ConvertKit email marketing API client
pub mod convertkit;
/// Stripe checkout and webhook verification
pub mod stripe;

pub use chat_backend::{ChatBackend, ChatMessage, HttpChatBackend};
pub use convertkit::ConvertKitClient;
pub use stripe::{StripeClient, WebhookEvent};
