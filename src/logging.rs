// ABOUTME: Tracing subscriber initialization for the server binary
// ABOUTME: Honors RUST_LOG with an info-level default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Reads `RUST_LOG` for filter directives; defaults to `info` for this
/// crate and `warn` elsewhere. Calling this twice is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,stillwater_server=info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
