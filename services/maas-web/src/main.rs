//! Millet-as-a-Service web backend
//!
//! Single-binary axum service that:
//! 1. Loads config and the Gemini API keys
//! 2. Builds a shared credential pool and AI gateway
//! 3. Serves the advisory, dashboard, product catalog and simulated-data endpoints

mod app;
mod catalog;
mod config;
mod error;
mod metrics;
mod prompts;
mod simulated;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use ai_gateway::AiGateway;
use anyhow::{Context, Result};
use key_pool::CredentialPool;
use provider::GeminiGenerator;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{AppState, ServiceStats, build_router};
use crate::catalog::InMemoryStore;
use crate::config::Config;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting maas-web");

    // Recorder must exist before the first metric is emitted
    let prometheus =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let pool = Arc::new(
        CredentialPool::new(config.gemini.api_keys.clone(), config.pool.cooldown())
            .context("failed to build credential pool")?,
    );

    info!(
        listen_addr = %config.server.listen_addr,
        model = %config.gemini.model,
        keys = pool.len(),
        key_labels = ?pool.labels(),
        attempt_timeout_secs = config.gemini.attempt_timeout_secs,
        cooldown_secs = config.pool.cooldown_secs,
        "configuration loaded"
    );

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let generator = Arc::new(GeminiGenerator::new(
        client,
        &config.gemini.base_url,
        &config.gemini.model,
    ));
    let gateway = Arc::new(AiGateway::new(
        pool,
        generator,
        config.gemini.attempt_timeout(),
    ));

    let catalog = Arc::new(InMemoryStore::seeded());

    let state = AppState {
        gateway,
        catalog,
        stats: ServiceStats::new(),
        prometheus,
    };
    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "listening");

    // Drain timer starts at signal receipt, not at server start
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
