//! Price Feed Binary
//!
//! Starts the Infoway price feed and its health endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required for streaming
//! - `INFOWAY_API_KEY`: Infoway API key. Without it the service runs idle
//!   and reports `inactive` on `/health`.
//!
//! ## Optional
//! - `INFOWAY_HOST`: Upstream host (default: data.infoway.io)
//! - `PRICE_FEED_SEGMENTS`: Comma-separated segments (default: forex,crypto)
//! - `PRICE_FEED_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `PRICE_FEED_MAX_RECONNECT_ATTEMPTS`: Per-segment bound, 0 = unlimited (default: 10)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: price-feed)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use price_feed::{
    FeedConfig, HealthServer, HealthServerState, PriceFeedService, PriceQuery, init_metrics,
    init_telemetry,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Interval between feed status log lines.
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = init_telemetry();

    tracing::info!("Starting Price Feed");

    // Initialize Prometheus metrics
    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder unavailable");
    }

    let config = FeedConfig::from_env().context("invalid price feed configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let health_port = config.server.health_port;
    let service = Arc::new(PriceFeedService::new(config));

    // Spawn health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&service) as Arc<dyn PriceQuery>,
    ));
    let health_server = HealthServer::new(health_port, health_state, shutdown_token.clone());
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    if service.connect() {
        let status_service = Arc::clone(&service);
        let status_cancel = shutdown_token.clone();
        tokio::spawn(async move {
            log_status_periodically(status_service, status_cancel).await;
        });
        tracing::info!("Price feed ready");
    } else {
        tracing::warn!("Price feed inactive, serving health endpoint only");
    }

    await_shutdown(shutdown_token).await;
    service.disconnect().await;

    tracing::info!("Price feed stopped");
    Ok(())
}

/// Log a one-line feed summary until cancelled.
async fn log_status_periodically(service: Arc<PriceFeedService>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + STATUS_LOG_INTERVAL,
        STATUS_LOG_INTERVAL,
    );
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let status = service.connection_status();
                tracing::info!(
                    connected = status.overall_connected,
                    open_segments = status.connected_segments(),
                    cached_symbols = status.cached_symbol_count,
                    reconnect_attempts = status.reconnect_attempts,
                    "Feed status"
                );
            }
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration. The API key is never printed.
fn log_config(config: &FeedConfig) {
    let segments: Vec<&str> = config.segments.iter().map(|s| s.as_str()).collect();
    tracing::info!(
        host = %config.host,
        segments = ?segments,
        credentials = config.has_credentials(),
        health_port = config.server.health_port,
        max_reconnect_attempts = config.websocket.max_reconnect_attempts,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started");
}
