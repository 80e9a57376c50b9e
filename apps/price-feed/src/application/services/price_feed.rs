//! Price feed facade.
//!
//! Owns the quote cache, the broadcast hub and one connection record per
//! segment. Segment clients run as independent tasks; the facade only
//! spawns, cancels and reads them.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ingest::QuoteIngestor;
use crate::application::ports::{PriceQuery, QuoteSink};
use crate::domain::instrument::{self, InstrumentInfo};
use crate::domain::quote::{Quote, QuoteCache};
use crate::domain::streaming::{ConnectionStatus, Segment};
use crate::infrastructure::broadcast::{
    BroadcastConfig, BroadcastHub, BroadcastStats, FeedEvent, QuoteUpdate, SharedBroadcastHub,
};
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::infoway::{SegmentClient, SegmentClientConfig, SegmentConnection};

/// How long `disconnect` waits for segment tasks to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only view over the quote cache.
#[derive(Debug, Clone)]
pub struct PriceCacheView {
    cache: Arc<QuoteCache>,
}

impl PriceCacheView {
    /// Latest quote for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.cache.get(symbol)
    }

    /// Whether `symbol` has a cached quote.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.cache.contains(symbol)
    }

    /// Cached symbol count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cached symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.cache.symbols()
    }

    /// Owned copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Quote> {
        self.cache.snapshot()
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    cancel: Option<CancellationToken>,
    tasks: Vec<(Segment, JoinHandle<()>)>,
}

/// Streaming price feed: connection management plus the query facade.
///
/// # Example
///
/// ```rust,no_run
/// use price_feed::{FeedConfig, PriceFeedService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = PriceFeedService::new(FeedConfig::from_env()?);
/// if service.connect() {
///     let mut quotes = service.subscribe_quotes();
///     while let Ok(update) = quotes.recv().await {
///         println!("{} {}", update.quote.symbol, update.quote.bid);
///     }
/// }
/// service.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PriceFeedService {
    config: FeedConfig,
    cache: Arc<QuoteCache>,
    hub: SharedBroadcastHub,
    ingestor: Arc<QuoteIngestor>,
    connections: RwLock<Vec<Arc<SegmentConnection>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl PriceFeedService {
    /// Build the service. Nothing connects until [`connect`](Self::connect).
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        let cache = Arc::new(QuoteCache::new());
        let hub = Arc::new(BroadcastHub::new(BroadcastConfig::from(config.broadcast)));
        let ingestor = Arc::new(QuoteIngestor::new(Arc::clone(&cache), Arc::clone(&hub)));
        let connections = config
            .segments
            .iter()
            .map(|segment| Arc::new(SegmentConnection::new(*segment)))
            .collect();

        Self {
            config,
            cache,
            hub,
            ingestor,
            connections: RwLock::new(connections),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Start every configured segment, staggered by the configured offset.
    ///
    /// Returns `false` without error when no API key is configured. Calling
    /// it again while running is a no-op returning `true`. Must be called
    /// from within a tokio runtime.
    pub fn connect(&self) -> bool {
        if !self.config.has_credentials() {
            tracing::warn!("INFOWAY_API_KEY not set, price feed stays inactive");
            return false;
        }
        if self.is_running() {
            return true;
        }

        let stagger = self.config.websocket.segment_stagger;
        let mut started = 0_u32;
        for segment in self.config.segments.clone() {
            let Some(endpoint) = self.config.endpoint_url(segment) else {
                continue;
            };
            let symbols = segment.symbols();
            if self.spawn_segment(segment, endpoint, symbols, stagger * started) {
                started += 1;
            }
        }

        tracing::info!(segments = started, "Price feed started");
        started > 0
    }

    /// Connect a single segment to `endpoint` with an explicit symbol set.
    ///
    /// Returns `false` without error when no API key is configured,
    /// `symbols` is empty, or the segment already has a running client.
    /// Must be called from within a tokio runtime.
    pub fn connect_segment(&self, segment: Segment, endpoint: String, symbols: Vec<String>) -> bool {
        if !self.config.has_credentials() {
            tracing::warn!(segment = %segment, "INFOWAY_API_KEY not set, segment stays inactive");
            return false;
        }
        self.spawn_segment(segment, endpoint, symbols, Duration::ZERO)
    }

    fn spawn_segment(
        &self,
        segment: Segment,
        endpoint: String,
        symbols: Vec<String>,
        start_delay: Duration,
    ) -> bool {
        if symbols.is_empty() {
            tracing::info!(segment = %segment, "No symbols for segment, not connecting");
            return false;
        }

        let connection = self.connection_for(segment);
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle
            .tasks
            .iter()
            .any(|(running, task)| *running == segment && !task.is_finished())
        {
            tracing::warn!(segment = %segment, "Segment client already running, not spawning another");
            return false;
        }
        let cancel = lifecycle.cancel.get_or_insert_with(CancellationToken::new).clone();

        let config = SegmentClientConfig::new(segment, endpoint, symbols)
            .with_websocket_settings(&self.config.websocket)
            .with_start_delay(start_delay);
        let sink: Arc<dyn QuoteSink> = Arc::clone(&self.ingestor) as Arc<dyn QuoteSink>;
        let client = Arc::new(SegmentClient::new(
            config,
            Arc::clone(&connection),
            sink,
            Arc::clone(&self.hub),
            cancel,
        ));

        let task = tokio::spawn(async move {
            match AssertUnwindSafe(client.run()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(segment = %segment, error = %e, "Segment client stopped");
                }
                Err(_) => {
                    tracing::error!(segment = %segment, "Segment client panicked");
                    connection.record_task_failure("segment task panicked".to_string());
                }
            }
        });
        lifecycle.tasks.push((segment, task));

        tracing::info!(
            segment = %segment,
            start_delay_ms = u64::try_from(start_delay.as_millis()).unwrap_or(u64::MAX),
            "Segment client spawned"
        );
        true
    }

    fn connection_for(&self, segment: Segment) -> Arc<SegmentConnection> {
        if let Some(existing) = self.connections.read().iter().find(|c| c.segment() == segment) {
            return Arc::clone(existing);
        }
        let mut connections = self.connections.write();
        if let Some(existing) = connections.iter().find(|c| c.segment() == segment) {
            return Arc::clone(existing);
        }
        let created = Arc::new(SegmentConnection::new(segment));
        connections.push(Arc::clone(&created));
        created
    }

    /// Cancel every segment task and wait for them to close.
    pub async fn disconnect(&self) {
        let (cancel, tasks) = {
            let mut lifecycle = self.lifecycle.lock();
            (lifecycle.cancel.take(), std::mem::take(&mut lifecycle.tasks))
        };

        let Some(cancel) = cancel else {
            return;
        };
        cancel.cancel();

        let join_all = async {
            for (_, task) in tasks {
                if let Err(e) = task.await
                    && !e.is_cancelled()
                {
                    tracing::error!(error = %e, "Segment task failed");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all).await.is_err() {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Segment tasks did not stop in time"
            );
        }

        tracing::info!("Price feed disconnected");
    }

    /// Whether segment tasks have been started and not yet disconnected.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().cancel.is_some()
    }

    /// Latest quote for `symbol`.
    #[must_use]
    pub fn get_price(&self, symbol: &str) -> Option<Quote> {
        self.cache.get(symbol)
    }

    /// Snapshot of every cached quote.
    #[must_use]
    pub fn get_all_prices(&self) -> HashMap<String, Quote> {
        self.cache.snapshot()
    }

    /// Read-only cache view.
    #[must_use]
    pub fn price_cache(&self) -> PriceCacheView {
        PriceCacheView {
            cache: Arc::clone(&self.cache),
        }
    }

    /// Current connection status across segments.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        let segments = self.connections.read().iter().map(|c| c.status()).collect();
        ConnectionStatus::new(segments, self.cache.len())
    }

    /// Allow-listed instruments with price availability.
    #[must_use]
    pub fn available_instruments(&self) -> Vec<InstrumentInfo> {
        instrument::available_instruments(|symbol| self.cache.contains(symbol))
    }

    /// Receive every cache write.
    #[must_use]
    pub fn subscribe_quotes(&self) -> broadcast::Receiver<QuoteUpdate> {
        self.hub.quote_updates_rx()
    }

    /// Receive connection lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.hub.events_rx()
    }

    /// Broadcast receiver counts.
    #[must_use]
    pub fn broadcast_stats(&self) -> BroadcastStats {
        self.hub.stats()
    }

    /// Configuration the service was built with.
    #[must_use]
    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }
}

impl PriceQuery for PriceFeedService {
    fn get_price(&self, symbol: &str) -> Option<Quote> {
        Self::get_price(self, symbol)
    }

    fn get_all_prices(&self) -> HashMap<String, Quote> {
        Self::get_all_prices(self)
    }

    fn connection_status(&self) -> ConnectionStatus {
        Self::connection_status(self)
    }

    fn available_instruments(&self) -> Vec<InstrumentInfo> {
        Self::available_instruments(self)
    }

    fn is_active(&self) -> bool {
        self.config.has_credentials()
    }
}
