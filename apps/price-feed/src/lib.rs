#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! Price Feed - Market Data Ingestion Service
//!
//! Keeps one streaming connection per Infoway market segment, turns price
//! pushes into two-sided quotes with synthesized spreads, and serves the
//! latest quote per symbol together with connection health.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote model and pure logic
//!   - `quote`: price updates, quotes, the last-value cache
//!   - `spread`: bid/ask synthesis rules
//!   - `instrument`: allow-lists, classification, listing metadata
//!   - `streaming`: segments, connection states, status snapshots
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `QuoteSink`, `PriceQuery`
//!   - `services`: quote ingestion, the `PriceFeedService` facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `infoway`: segment WebSocket clients
//!   - `broadcast`: quote and event fan-out
//!   - `config`: environment configuration
//!   - `health`: health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Infoway common WS ──┐
//!                     ├──► decode ──► spread ──► QuoteCache ──► Broadcast
//! Infoway crypto WS ──┘                              │
//!                                                    └──► PriceFeedService queries
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote model, spreads and instruments; no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{AssetClass, InstrumentInfo};
pub use domain::quote::{PriceUpdate, Quote, QuoteCache, TradeDirection};
pub use domain::spread::SpreadSynthesizer;
pub use domain::streaming::{ConnectionState, ConnectionStatus, Segment, SegmentStatus};

// Application services
pub use application::ports::{PriceQuery, QuoteSink};
pub use application::services::{PriceCacheView, PriceFeedService, QuoteIngestor};

// Infrastructure config
pub use infrastructure::config::{
    ApiKey, BroadcastSettings, ConfigError, FeedConfig, ServerSettings, WebSocketSettings,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Broadcast hub
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastHub, BroadcastStats, FeedEvent, QuoteUpdate, SharedBroadcastHub,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
