//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, feed status reporting, and Prometheus
//! metrics. Used by container orchestrators and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status with per-segment detail
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (at least one segment open)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::PriceQuery;
use crate::domain::streaming::ConnectionStatus;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Feed connection status.
    pub feed: ConnectionStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every configured segment is open.
    Healthy,
    /// Some segments are open.
    Degraded,
    /// No segment is open.
    Unhealthy,
    /// No API key configured; the feed is intentionally idle.
    Inactive,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    query: Arc<dyn PriceQuery>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, query: Arc<dyn PriceQuery>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            query,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the health router.
#[must_use]
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded | HealthStatus::Inactive => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.query.connection_status().overall_connected {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let feed = state.query.connection_status();
    HealthResponse {
        status: determine_health_status(&feed, state.query.is_active()),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed,
    }
}

fn determine_health_status(feed: &ConnectionStatus, active: bool) -> HealthStatus {
    if !active {
        return HealthStatus::Inactive;
    }
    match feed.connected_segments() {
        0 => HealthStatus::Unhealthy,
        n if n == feed.segments.len() => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::MockPriceQuery;
    use crate::domain::streaming::{ConnectionState, Segment, SegmentStatus};

    fn segment(segment: Segment, open: bool) -> SegmentStatus {
        let state = if open {
            ConnectionState::Open
        } else {
            ConnectionState::Disconnected
        };
        SegmentStatus {
            segment,
            state,
            connected: open,
            reconnect_attempts: if open { 0 } else { 3 },
            frames_received: 10,
            subscribed_symbols: 24,
            last_connected_at: None,
            last_error: None,
        }
    }

    fn status(forex: bool, crypto: bool) -> ConnectionStatus {
        ConnectionStatus::new(
            vec![segment(Segment::Forex, forex), segment(Segment::Crypto, crypto)],
            5,
        )
    }

    fn app(status: ConnectionStatus, active: bool) -> Router {
        let mut query = MockPriceQuery::new();
        query
            .expect_connection_status()
            .returning(move || status.clone());
        query.expect_is_active().return_const(active);
        router(Arc::new(HealthServerState::new("test".to_string(), Arc::new(query))))
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let code = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (code, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Inactive).unwrap(), "\"inactive\"");
    }

    #[test]
    fn determine_status() {
        assert_eq!(determine_health_status(&status(true, true), true), HealthStatus::Healthy);
        assert_eq!(determine_health_status(&status(true, false), true), HealthStatus::Degraded);
        assert_eq!(determine_health_status(&status(false, false), true), HealthStatus::Unhealthy);
        assert_eq!(determine_health_status(&status(false, false), false), HealthStatus::Inactive);
    }

    #[tokio::test]
    async fn health_reports_segments() {
        let (code, body) = get_path(app(status(true, false), true), "/health").await;
        assert_eq!(code, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["feed"]["overall_connected"], true);
        assert_eq!(json["feed"]["reconnect_attempts"], 3);
        assert_eq!(json["feed"]["segments"][1]["segment"], "crypto");
        assert_eq!(json["feed"]["segments"][1]["state"], "disconnected");
    }

    #[tokio::test]
    async fn health_is_unavailable_when_all_segments_down() {
        let (code, _) = get_path(app(status(false, false), true), "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn inactive_feed_is_still_healthy_http() {
        let (code, body) = get_path(app(status(false, false), false), "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("\"inactive\""));
    }

    #[tokio::test]
    async fn readiness_follows_overall_connected() {
        let (code, body) = get_path(app(status(false, true), true), "/readyz").await;
        assert_eq!((code, body.as_str()), (StatusCode::OK, "READY"));

        let (code, body) = get_path(app(status(false, false), true), "/readyz").await;
        assert_eq!((code, body.as_str()), (StatusCode::SERVICE_UNAVAILABLE, "NOT READY"));
    }

    #[tokio::test]
    async fn liveness_is_unconditional() {
        let (code, body) = get_path(app(status(false, false), false), "/healthz").await;
        assert_eq!((code, body.as_str()), (StatusCode::OK, "OK"));
    }
}
