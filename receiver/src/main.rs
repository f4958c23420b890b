//! CallBridge Web Server - Telnyx webhook receiver.
//!
//! Binds an HTTP listener and serves the webhook endpoint. Startup fails
//! closed: an unusable public key or a missing connect destination aborts
//! before the listener binds, so the process never serves requests it
//! cannot verify or act on.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use callbridge::web::{health, telnyx_webhook, AppState, WebhookVerifier};
use callbridge::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration; key import or a missing destination is fatal
    let config = Config::from_env();

    let verifier = WebhookVerifier::from_config(&config)
        .context("TELNYX_PUBLIC_KEY must be the base64 raw 32-byte Ed25519 key")?;

    let destination = config
        .connect_destination
        .clone()
        .filter(|d| !d.trim().is_empty())
        .context("CONNECT_DESTINATION must be set to a SIP destination")?;

    info!(
        port = config.port,
        signature_policy = verifier.policy().as_str(),
        max_body_bytes = config.max_body_bytes,
        replay_window_seconds = ?config.signature_max_age,
        "config_loaded"
    );

    let port = config.port;
    let state = AppState::new(config, verifier, destination);

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhooks/telnyx", post(telnyx_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

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

    info!("web_server_shutting_down");
}
