//! Streaming Connection Types
//!
//! Market segments, per-segment connection state, and the status snapshot
//! reported to callers. Each segment maps to one upstream WebSocket
//! connection carrying its own symbol subscription set.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::instrument;

// =============================================================================
// Segment
// =============================================================================

/// Upstream market segment served by a single streaming connection.
///
/// Fewer segments exist than asset classes: the vendor limits concurrent
/// connections, so forex, metals and energy share the `Forex` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Forex pairs, metals and energy (vendor business `common`).
    Forex,
    /// Crypto pairs quoted in USDT (vendor business `crypto`).
    Crypto,
    /// Equities (vendor business `stock`).
    Stocks,
}

impl Segment {
    /// All known segments in connection order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Forex, Self::Crypto, Self::Stocks]
    }

    /// Short name used in logs, metrics labels and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forex => "forex",
            Self::Crypto => "crypto",
            Self::Stocks => "stocks",
        }
    }

    /// Vendor `business` discriminator used in the endpoint URL.
    #[must_use]
    pub const fn business(self) -> &'static str {
        match self {
            Self::Forex => "common",
            Self::Crypto => "crypto",
            Self::Stocks => "stock",
        }
    }

    /// Parse a segment name, accepting the vendor discriminator as an alias.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "forex" | "common" => Some(Self::Forex),
            "crypto" => Some(Self::Crypto),
            "stocks" | "stock" => Some(Self::Stocks),
            _ => None,
        }
    }

    /// Allow-listed symbols subscribed on this segment.
    #[must_use]
    pub fn symbols(self) -> Vec<String> {
        instrument::segment_symbols(self)
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of a segment connection.
///
/// `Disconnected → Connecting → Open → Closing → Disconnected`, re-entering
/// `Connecting` while reconnect attempts remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Transport open; frames flowing.
    Open,
    /// Close in progress.
    Closing,
}

impl ConnectionState {
    /// Name used in status output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }

    /// Whether the transport is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

// =============================================================================
// Status Snapshots
// =============================================================================

/// Point-in-time status of one segment connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentStatus {
    /// Segment this status describes.
    pub segment: Segment,
    /// Current connection state.
    pub state: ConnectionState,
    /// Shorthand for `state == Open`.
    pub connected: bool,
    /// Consecutive reconnect attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// Frames received over the segment's lifetime.
    pub frames_received: u64,
    /// Number of symbols in the segment's subscription set.
    pub subscribed_symbols: usize,
    /// Time of the last successful open.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last transport or upstream error observed.
    pub last_error: Option<String>,
}

/// Aggregate status reported by the query facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// True when at least one segment connection is open.
    pub overall_connected: bool,
    /// Per-segment status, in configuration order.
    pub segments: Vec<SegmentStatus>,
    /// Number of symbols with a cached quote.
    pub cached_symbol_count: usize,
    /// Sum of reconnect attempts across segments.
    pub reconnect_attempts: u32,
}

impl ConnectionStatus {
    /// Build a status from segment snapshots and the cache size.
    #[must_use]
    pub fn new(segments: Vec<SegmentStatus>, cached_symbol_count: usize) -> Self {
        let overall_connected = segments.iter().any(|s| s.connected);
        let reconnect_attempts = segments.iter().map(|s| s.reconnect_attempts).sum();
        Self {
            overall_connected,
            segments,
            cached_symbol_count,
            reconnect_attempts,
        }
    }

    /// Status of a single segment, if configured.
    #[must_use]
    pub fn segment(&self, segment: Segment) -> Option<&SegmentStatus> {
        self.segments.iter().find(|s| s.segment == segment)
    }

    /// Whether the given segment is configured and open.
    #[must_use]
    pub fn is_segment_connected(&self, segment: Segment) -> bool {
        self.segment(segment).is_some_and(|s| s.connected)
    }

    /// Number of open segment connections.
    #[must_use]
    pub fn connected_segments(&self) -> usize {
        self.segments.iter().filter(|s| s.connected).count()
    }
}
