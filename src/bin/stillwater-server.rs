// ABOUTME: Main server binary for the Stillwater Recovery API
// ABOUTME: Loads env config, connects the database, and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stillwater Recovery

//! # Stillwater server
//!
//! ```bash
//! # Run with environment configuration
//! cargo run --bin stillwater-server
//!
//! # Override the listen port and database
//! cargo run --bin stillwater-server -- --port 9090 --database-url sqlite:./dev.db
//! ```

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use stillwater_server::{
    config::ServerConfig, database::Database, logging, resources::ServerResources, server,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "stillwater-server", about = "Stillwater Recovery API server")]
struct Args {
    /// HTTP listen port (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    info!("Starting stillwater-server v{}", env!("CARGO_PKG_VERSION"));

    let database = Database::new(&config.database_url).await?;
    let resources = Arc::new(ServerResources::new(database, config));

    server::run(resources).await?;
    Ok(())
}
