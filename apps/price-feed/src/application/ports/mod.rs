//! Port Interfaces
//!
//! Contracts between the feed's infrastructure adapters and its
//! application services, following the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSink`: where segment clients deliver validated price updates
//!
//! ## Driver Ports (Inbound)
//!
//! - `PriceQuery`: read-only access to quotes and connection health

use std::collections::HashMap;

use crate::domain::instrument::InstrumentInfo;
use crate::domain::quote::{PriceUpdate, Quote};
use crate::domain::streaming::{ConnectionStatus, Segment};

/// Receives validated price updates from a segment connection.
///
/// Implementations must not block: they are called inline from the
/// connection's read loop.
#[cfg_attr(test, mockall::automock)]
pub trait QuoteSink: Send + Sync {
    /// Apply an update and return the quote that was cached, or `None` if
    /// the update was rejected and the cache left unchanged.
    fn accept(&self, segment: Segment, update: PriceUpdate) -> Option<Quote>;
}

/// Read-only query surface over the feed.
#[cfg_attr(test, mockall::automock)]
pub trait PriceQuery: Send + Sync {
    /// Latest quote for `symbol`.
    fn get_price(&self, symbol: &str) -> Option<Quote>;

    /// Snapshot of every cached quote.
    fn get_all_prices(&self) -> HashMap<String, Quote>;

    /// Current connection status.
    fn connection_status(&self) -> ConnectionStatus;

    /// Allow-listed instruments with price availability.
    fn available_instruments(&self) -> Vec<InstrumentInfo>;

    /// Whether the feed is configured to connect at all.
    fn is_active(&self) -> bool;
}
