//! Quote Types
//!
//! The canonical internal representation of a vendor price push and of the
//! cached two-sided quote derived from it.

mod cache;

pub use cache::QuoteCache;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of the last trade as reported by the vendor (`td` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// No direction (`td = 0`).
    Neutral,
    /// Buyer-initiated (`td = 1`).
    Buy,
    /// Seller-initiated (`td = 2`).
    Sell,
}

impl TradeDirection {
    /// Map the vendor code; unknown codes yield `None`.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Neutral),
            1 => Some(Self::Buy),
            2 => Some(Self::Sell),
            _ => None,
        }
    }
}

/// A validated single-price update decoded from a vendor push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    /// Instrument symbol.
    pub symbol: String,
    /// Last traded / reference price. Always positive.
    pub price: Decimal,
    /// Vendor timestamp, passed through unchanged.
    pub timestamp: Option<i64>,
    /// Traded volume, if present.
    pub volume: Option<Decimal>,
    /// Trade direction, if present.
    pub direction: Option<TradeDirection>,
}

/// Latest two-sided quote for one symbol.
///
/// `bid` is the reference price and `ask = bid + spread` with a
/// non-negative spread, so `ask >= bid` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Instrument symbol.
    pub symbol: String,
    /// Last traded / reference price.
    pub price: Decimal,
    /// Synthesized bid.
    pub bid: Decimal,
    /// Synthesized ask.
    pub ask: Decimal,
    /// Vendor timestamp.
    pub timestamp: Option<i64>,
    /// Traded volume.
    pub volume: Option<Decimal>,
    /// Trade direction.
    pub direction: Option<TradeDirection>,
    /// Local receive time.
    pub received_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote from an update and a synthesized spread.
    ///
    /// Negative spreads are clamped to zero. Returns `None` when the ask
    /// does not fit in a `Decimal`.
    #[must_use]
    pub fn from_update(update: PriceUpdate, spread: Decimal) -> Option<Self> {
        let bid = update.price;
        let ask = bid.checked_add(spread.max(Decimal::ZERO))?;
        Some(Self {
            symbol: update.symbol,
            price: update.price,
            bid,
            ask,
            timestamp: update.timestamp,
            volume: update.volume,
            direction: update.direction,
            received_at: Utc::now(),
        })
    }

    /// Ask minus bid.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}
