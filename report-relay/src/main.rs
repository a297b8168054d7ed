//! Report Relay - webhook receiver binary.
//!
//! Loads configuration from the environment, starts the webhook listener and
//! runs until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use report_relay::{
    AppState, Config, HttpRenderer, OneBotMessenger, RelayError, ReportPipeline, WebhookServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("report_relay_starting");

    // Load and validate configuration
    let config = Config::from_env();
    config
        .validate()
        .map_err(RelayError::from)
        .context("Invalid configuration")?;
    info!(
        host = %config.webhook_host,
        port = config.webhook_port,
        path = %config.webhook_path,
        signature_verification = config.enable_signature_verification,
        secret_configured = config.has_secret(),
        signature_max_age_secs = ?config.signature_max_age_secs,
        target_groups = config.target_groups.len(),
        broadcast_delay_ms = config.broadcast_delay_ms,
        broadcast_continue_on_error = config.broadcast_continue_on_error,
        render_service_url = %config.render_service_url,
        messaging_api_url = %config.messaging_api_url,
        "config_loaded"
    );

    // Shared HTTP client for the renderer and the messaging API
    let client = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create HTTP client")?;

    let renderer = Arc::new(HttpRenderer::new(
        client.clone(),
        config.render_service_url.clone(),
    ));
    let messenger = Arc::new(OneBotMessenger::new(
        client,
        config.messaging_api_url.clone(),
        config.messaging_access_token.clone(),
    ));

    let pipeline = ReportPipeline::from_config(&config, renderer, messenger);
    let mut server = WebhookServer::new(AppState::new(config, pipeline));

    server
        .start()
        .await
        .context("Failed to start webhook server")?;

    shutdown_signal().await;

    server.stop().await;

    info!("report_relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("report_relay_shutting_down");
}
