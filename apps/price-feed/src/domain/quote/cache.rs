//! Last-value quote cache.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{PriceUpdate, Quote};
use crate::domain::spread::SpreadSynthesizer;

/// Thread-safe last-value store keyed by symbol.
///
/// Entries are replaced wholesale; the lock is held only for the map
/// operation itself, never across I/O.
#[derive(Debug, Default)]
pub struct QuoteCache {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl QuoteCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `symbol` unconditionally.
    pub fn put(&self, symbol: impl Into<String>, quote: Quote) {
        self.quotes.write().insert(symbol.into(), quote);
    }

    /// Synthesize a quote from `update` against the previous entry and store it.
    ///
    /// The previous-value read and the replacement happen under one write
    /// lock, so a concurrent writer for the same symbol cannot interleave.
    /// Returns `None` and leaves the entry untouched when the quote cannot
    /// be represented.
    pub fn apply(&self, update: PriceUpdate, synthesizer: &SpreadSynthesizer) -> Option<Quote> {
        let mut quotes = self.quotes.write();
        let spread = synthesizer.spread(&update.symbol, quotes.get(&update.symbol));
        let quote = Quote::from_update(update, spread)?;
        quotes.insert(quote.symbol.clone(), quote.clone());
        Some(quote)
    }

    /// Current quote for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.quotes.read().get(symbol).cloned()
    }

    /// Whether a quote is cached for `symbol`.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.read().contains_key(symbol)
    }

    /// Owned copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Quote> {
        self.quotes.read().clone()
    }

    /// Cached symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.quotes.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of cached symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::thread;

    use rust_decimal::Decimal;

    use super::*;

    fn update(symbol: &str, price: &str) -> PriceUpdate {
        PriceUpdate {
            symbol: symbol.to_string(),
            price: Decimal::from_str(price).unwrap(),
            timestamp: Some(1_700_000_000),
            volume: None,
            direction: None,
        }
    }

    #[test]
    fn empty_cache_returns_none() {
        let cache = QuoteCache::new();
        assert!(cache.get("ZZZUNKNOWN").is_none());
        assert!(!cache.contains("ZZZUNKNOWN"));
        assert!(cache.is_empty());
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = QuoteCache::new();
        let first = Quote::from_update(update("EURUSD", "1.0800"), Decimal::ZERO).unwrap();
        let second = Quote::from_update(update("EURUSD", "1.0900"), Decimal::ZERO).unwrap();

        cache.put("EURUSD", first);
        cache.put("EURUSD", second.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("EURUSD"), Some(second));
    }

    #[test]
    fn apply_uses_previous_quote_for_crypto_spread() {
        let cache = QuoteCache::new();
        let synthesizer = SpreadSynthesizer::new();

        let first = cache.apply(update("BTCUSDT", "50000"), &synthesizer).unwrap();
        assert_eq!(first.spread(), Decimal::from_str("0.01").unwrap());

        let second = cache.apply(update("BTCUSDT", "50000"), &synthesizer).unwrap();
        assert_eq!(second.spread(), Decimal::from(5));
        assert_eq!(cache.get("BTCUSDT").unwrap().ask, Decimal::from_str("50005").unwrap());
    }

    #[test]
    fn crypto_tick_near_decimal_max_is_dropped() {
        let cache = QuoteCache::new();
        let synthesizer = SpreadSynthesizer::new();
        let max = update("BTCUSDT", "79228162514264337593543950335");
        let previous = Quote::from_update(max.clone(), Decimal::ZERO).unwrap();
        cache.put("BTCUSDT", previous.clone());

        // Spread scales off the huge previous price, so the ask overflows.
        assert!(cache.apply(max, &synthesizer).is_none());
        assert_eq!(cache.get("BTCUSDT"), Some(previous));

        let normal = cache.apply(update("BTCUSDT", "50000"), &synthesizer);
        assert!(normal.is_some(), "later ticks are still applied");
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let cache = QuoteCache::new();
        let synthesizer = SpreadSynthesizer::new();
        let _ = cache.apply(update("EURUSD", "1.08"), &synthesizer);

        let snapshot = cache.snapshot();
        let _ = cache.apply(update("GBPUSD", "1.26"), &synthesizer);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.symbols(), vec!["EURUSD", "GBPUSD"]);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let cache = Arc::new(QuoteCache::new());
        let synthesizer = Arc::new(SpreadSynthesizer::new());
        let mut handles = vec![];

        for i in 0..8 {
            let c = Arc::clone(&cache);
            let s = Arc::clone(&synthesizer);
            handles.push(thread::spawn(move || {
                for n in 1..=50 {
                    let _ = c.apply(update(&format!("SYM{i}"), &n.to_string()), &s);
                    let _ = c.snapshot();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        for i in 0..8 {
            assert_eq!(cache.get(&format!("SYM{i}")).unwrap().price, Decimal::from(50));
        }
    }
}
