// ABOUTME: Stillwater Recovery API server library
// ABOUTME: Purchase-gated courses, lesson progress, and the metered AI coach
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

//! # Stillwater Recovery API Server
//!
//! Backend for the Stillwater Recovery membership site:
//!
//! - **Purchase ledger and access gate**: course content is visible only to
//!   users holding a completed purchase for the product
//! - **Course delivery**: modules and lessons in editorial order, with
//!   per-lesson completion tracking and derived progress percentages
//! - **AI coach**: a metered chat relay with anonymous, registered, and
//!   unlimited tiers
//! - **Commerce**: Stripe checkout and webhook ingestion, newsletter
//!   subscriptions, and lead magnet downloads

/// Purchase-based content access decisions
pub mod access;
/// Session tokens and password hashing
pub mod auth;
/// Sellable product definitions
pub mod catalog;
/// Environment-driven configuration
pub mod config;
/// Database pool, migrations, and per-table managers
pub mod database;
/// Application error type and HTTP mapping
pub mod errors;
/// Clients for Stripe, ConvertKit, and the chat backend
pub mod external;
/// Tracing subscriber setup
pub mod logging;
/// Core domain records
pub mod models;
/// Shared server state
pub mod resources;
/// HTTP route handlers
pub mod routes;
/// Cookie helpers
pub mod security;
/// Router assembly and serve loop
pub mod server;
/// Coach usage tier policy
pub mod usage;
