// ABOUTME: Server binary wiring config, store, broker, tokens, and the HTTP listener
// ABOUTME: Serves until ctrl-c, then shuts down gracefully
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use vaultgate::auth::TokenService;
use vaultgate::broker::JobBroker;
use vaultgate::config::ServerConfig;
use vaultgate::gateway::Gateway;
use vaultgate::storage::Database;
use vaultgate::{logging, routes};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    logging::init(config.log_level)?;

    let database = Database::new(&config.database_url)
        .await
        .context("failed to open backing store")?;

    let broker = JobBroker::new(
        config.worker_count,
        Duration::from_secs(config.job_deadline_secs),
    );
    let tokens = TokenService::new(
        config.signing_secret.as_bytes(),
        chrono::Duration::hours(config.token_ttl_hours),
    );
    let gateway = Arc::new(Gateway::new(broker, tokens, Arc::new(database)));

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    info!("vaultgate serving on {}", config.http_addr);

    axum::serve(listener, routes::router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("vaultgate shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
