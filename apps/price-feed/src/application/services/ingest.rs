//! Quote ingestion: spread synthesis, cache write, then broadcast.

use std::sync::Arc;

use crate::application::ports::QuoteSink;
use crate::domain::quote::{PriceUpdate, Quote, QuoteCache};
use crate::domain::spread::SpreadSynthesizer;
use crate::domain::streaming::Segment;
use crate::infrastructure::broadcast::{QuoteUpdate, SharedBroadcastHub};
use crate::infrastructure::metrics;

/// Applies validated updates to the shared cache and publishes them.
#[derive(Debug)]
pub struct QuoteIngestor {
    cache: Arc<QuoteCache>,
    synthesizer: SpreadSynthesizer,
    hub: SharedBroadcastHub,
}

impl QuoteIngestor {
    /// Create an ingestor writing to `cache` and publishing on `hub`.
    #[must_use]
    pub const fn new(cache: Arc<QuoteCache>, hub: SharedBroadcastHub) -> Self {
        Self {
            cache,
            synthesizer: SpreadSynthesizer::new(),
            hub,
        }
    }
}

impl QuoteSink for QuoteIngestor {
    fn accept(&self, segment: Segment, update: PriceUpdate) -> Option<Quote> {
        let symbol = update.symbol.clone();
        let Some(quote) = self.cache.apply(update, &self.synthesizer) else {
            tracing::debug!(segment = %segment, symbol = %symbol, "Quote out of range, update dropped");
            return None;
        };

        metrics::record_quote_updated(segment);
        metrics::set_cached_symbols(self.cache.len());

        tracing::trace!(
            segment = %segment,
            symbol = %quote.symbol,
            bid = %quote.bid,
            ask = %quote.ask,
            "Quote updated"
        );

        // Lagging or absent subscribers never hold up ingestion.
        let _ = self.hub.send_quote_update(QuoteUpdate {
            segment,
            quote: quote.clone(),
        });

        Some(quote)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::infrastructure::broadcast::BroadcastHub;

    fn update(symbol: &str, price: &str) -> PriceUpdate {
        PriceUpdate {
            symbol: symbol.to_string(),
            price: Decimal::from_str(price).unwrap(),
            timestamp: Some(1_700_000_000),
            volume: None,
            direction: None,
        }
    }

    #[tokio::test]
    async fn accepted_update_is_cached_before_broadcast() {
        let cache = Arc::new(QuoteCache::new());
        let hub = Arc::new(BroadcastHub::with_defaults());
        let mut rx = hub.quote_updates_rx();
        let ingestor = QuoteIngestor::new(Arc::clone(&cache), hub);

        let quote = ingestor.accept(Segment::Forex, update("EURUSD", "1.08450")).unwrap();

        assert_eq!(quote.bid, Decimal::from_str("1.08450").unwrap());
        assert_eq!(quote.ask, Decimal::from_str("1.08460").unwrap());

        let published = rx.recv().await.unwrap();
        assert_eq!(published.segment, Segment::Forex);
        assert_eq!(published.quote, quote);
        assert_eq!(cache.get("EURUSD"), Some(quote));
    }

    #[test]
    fn repeated_forex_update_is_idempotent() {
        let cache = Arc::new(QuoteCache::new());
        let ingestor = QuoteIngestor::new(Arc::clone(&cache), Arc::new(BroadcastHub::with_defaults()));

        let first = ingestor.accept(Segment::Forex, update("GBPUSD", "1.26500")).unwrap();
        let second = ingestor.accept(Segment::Forex, update("GBPUSD", "1.26500")).unwrap();

        assert_eq!(
            (first.bid, first.ask, first.timestamp),
            (second.bid, second.ask, second.timestamp)
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn crypto_spread_tracks_previous_price() {
        let cache = Arc::new(QuoteCache::new());
        let ingestor = QuoteIngestor::new(Arc::clone(&cache), Arc::new(BroadcastHub::with_defaults()));

        let first = ingestor.accept(Segment::Crypto, update("BTCUSDT", "50000")).unwrap();
        let second = ingestor.accept(Segment::Crypto, update("BTCUSDT", "50000")).unwrap();
        let third = ingestor.accept(Segment::Crypto, update("BTCUSDT", "50000")).unwrap();

        assert_eq!(first.ask, Decimal::from_str("50000.01").unwrap());
        assert_eq!(second.ask, Decimal::from(50_005));
        assert_eq!(second, Quote { received_at: second.received_at, ..third });
    }

    #[tokio::test]
    async fn overflowing_update_is_neither_cached_nor_published() {
        let cache = Arc::new(QuoteCache::new());
        let hub = Arc::new(BroadcastHub::with_defaults());
        let ingestor = QuoteIngestor::new(Arc::clone(&cache), Arc::clone(&hub));

        let huge = update("BTCUSDT", "79228162514264337593543950335");
        let previous = Quote::from_update(huge.clone(), Decimal::ZERO).unwrap();
        cache.put("BTCUSDT", previous.clone());

        let mut rx = hub.quote_updates_rx();
        assert!(ingestor.accept(Segment::Crypto, huge).is_none());
        assert!(rx.try_recv().is_err());
        assert_eq!(cache.get("BTCUSDT"), Some(previous));
    }
}
