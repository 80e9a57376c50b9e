//! Broadcast Channel Adapters
//!
//! Fan-out of quote updates and feed lifecycle events to any number of
//! in-process subscribers using tokio broadcast channels.
//!
//! # Channels
//!
//! - **Quote updates**: one message per cache write, after the write.
//! - **Feed events**: connection lifecycle and upstream notifications.
//!
//! Slow receivers lag and skip messages; senders never block.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::BroadcastSettings;
use crate::domain::quote::Quote;
use crate::domain::streaming::Segment;

// =============================================================================
// Broadcast Messages
// =============================================================================

/// A quote that was just written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteUpdate {
    /// Segment the push arrived on.
    pub segment: Segment,
    /// The cached quote.
    pub quote: Quote,
}

/// Connection lifecycle and upstream notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Transport opened.
    Connected {
        /// Segment.
        segment: Segment,
    },
    /// Subscribe request written.
    SubscriptionSent {
        /// Segment.
        segment: Segment,
        /// Number of symbols requested.
        symbols: usize,
    },
    /// Upstream acknowledged the subscription.
    Subscribed {
        /// Segment.
        segment: Segment,
        /// Server-provided message.
        message: Option<String>,
    },
    /// Upstream reported an error frame.
    UpstreamError {
        /// Segment.
        segment: Segment,
        /// Error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },
    /// Transport closed or failed.
    Disconnected {
        /// Segment.
        segment: Segment,
        /// Close reason.
        reason: String,
    },
    /// Reconnect scheduled.
    Reconnecting {
        /// Segment.
        segment: Segment,
        /// Consecutive attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay_ms: u64,
    },
    /// Reconnect attempts exhausted; the segment stays down.
    GaveUp {
        /// Segment.
        segment: Segment,
        /// Attempts made.
        attempts: u32,
    },
}

impl FeedEvent {
    /// Segment the event concerns.
    #[must_use]
    pub const fn segment(&self) -> Segment {
        match self {
            Self::Connected { segment }
            | Self::SubscriptionSent { segment, .. }
            | Self::Subscribed { segment, .. }
            | Self::UpstreamError { segment, .. }
            | Self::Disconnected { segment, .. }
            | Self::Reconnecting { segment, .. }
            | Self::GaveUp { segment, .. } => *segment,
        }
    }
}

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Configuration for broadcast channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Capacity for the quote update channel.
    pub quote_updates_capacity: usize,
    /// Capacity for the feed event channel.
    pub events_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        BroadcastSettings::default().into()
    }
}

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            quote_updates_capacity: settings.quote_updates_capacity,
            events_capacity: settings.events_capacity,
        }
    }
}

/// Central hub for the feed's broadcast channels.
///
/// # Example
///
/// ```rust
/// use price_feed::infrastructure::broadcast::{BroadcastConfig, BroadcastHub};
///
/// let hub = BroadcastHub::new(BroadcastConfig::default());
/// let mut quotes = hub.quote_updates_rx();
/// assert_eq!(hub.quote_updates_receiver_count(), 1);
/// # drop(quotes.try_recv());
/// ```
#[derive(Debug)]
pub struct BroadcastHub {
    quote_updates_tx: broadcast::Sender<QuoteUpdate>,
    events_tx: broadcast::Sender<FeedEvent>,
}

impl BroadcastHub {
    /// Create a new broadcast hub with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            quote_updates_tx: broadcast::channel(config.quote_updates_capacity.max(1)).0,
            events_tx: broadcast::channel(config.events_capacity.max(1)).0,
        }
    }

    /// Create a new broadcast hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    /// Publish a cache write.
    ///
    /// Returns the number of receivers, or `None` if there are none.
    #[must_use]
    pub fn send_quote_update(&self, update: QuoteUpdate) -> Option<usize> {
        self.quote_updates_tx.send(update).ok()
    }

    /// Get a new receiver for quote updates.
    #[must_use]
    pub fn quote_updates_rx(&self) -> broadcast::Receiver<QuoteUpdate> {
        self.quote_updates_tx.subscribe()
    }

    /// Number of active quote update receivers.
    #[must_use]
    pub fn quote_updates_receiver_count(&self) -> usize {
        self.quote_updates_tx.receiver_count()
    }

    /// Publish a feed event.
    #[must_use]
    pub fn send_event(&self, event: FeedEvent) -> Option<usize> {
        self.events_tx.send(event).ok()
    }

    /// Get a new receiver for feed events.
    #[must_use]
    pub fn events_rx(&self) -> broadcast::Receiver<FeedEvent> {
        self.events_tx.subscribe()
    }

    /// Number of active feed event receivers.
    #[must_use]
    pub fn events_receiver_count(&self) -> usize {
        self.events_tx.receiver_count()
    }

    /// Receiver counts across channels.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            quote_updates_receivers: self.quote_updates_receiver_count(),
            events_receivers: self.events_receiver_count(),
        }
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<BroadcastHub>;

/// Statistics about broadcast channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    /// Number of quote update receivers.
    pub quote_updates_receivers: usize,
    /// Number of feed event receivers.
    pub events_receivers: usize,
}

impl BroadcastStats {
    /// Total receivers across channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.quote_updates_receivers + self.events_receivers
    }
}
