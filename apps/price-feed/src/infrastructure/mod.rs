//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete adapters behind the application ports: the upstream WebSocket
//! client, broadcast fan-out, configuration, and operational endpoints.

/// Infoway WebSocket client (codec, heartbeat, reconnect, segment loop).
pub mod infoway;

/// Broadcast channel adapters for quote and event distribution.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
