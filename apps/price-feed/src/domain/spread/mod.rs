//! Spread Synthesizer
//!
//! The upstream feed publishes a single reference price per symbol. A
//! two-sided quote is synthesized as `bid = price`, `ask = price + spread`
//! where the spread comes from per-asset-class heuristics.
//!
//! # Rules (first match wins)
//!
//! | Condition                                  | Spread                     |
//! |--------------------------------------------|----------------------------|
//! | contains `XAU`                             | 0.30                       |
//! | contains `XAG`                             | 0.020                      |
//! | contains `OIL` or `NGAS`                   | 0.03                       |
//! | 6-char forex pair, major                   | 0.00010                    |
//! | 6-char forex pair, cross                   | 0.00020                    |
//! | contains `USDT`                            | 0.0001 × previous price    |
//! | otherwise                                  | 0.01                       |
//!
//! Commodity rules precede the forex-pair rule because `XAUUSD` and
//! `XAGUSD` are six characters and contain `USD`.

use rust_decimal::Decimal;

use crate::domain::instrument;
use crate::domain::quote::Quote;

/// Major pairs quoted at the tightest spread.
pub const MAJOR_PAIRS: [&str; 4] = ["EURUSD", "GBPUSD", "USDJPY", "USDCHF"];

const GOLD_SPREAD: Decimal = Decimal::from_parts(30, 0, 0, false, 2);
const SILVER_SPREAD: Decimal = Decimal::from_parts(20, 0, 0, false, 3);
const ENERGY_SPREAD: Decimal = Decimal::from_parts(3, 0, 0, false, 2);
const MAJOR_SPREAD: Decimal = Decimal::from_parts(10, 0, 0, false, 5);
const CROSS_SPREAD: Decimal = Decimal::from_parts(20, 0, 0, false, 5);
const CRYPTO_SPREAD_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);
const DEFAULT_SPREAD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Reference price used for crypto symbols with no cached quote yet.
// TODO: replace with a per-symbol reference once first-tick spreads are
// compared against vendor books; a flat 100 over-widens sub-dollar coins.
const CRYPTO_FALLBACK_REFERENCE: Decimal = Decimal::ONE_HUNDRED;

/// Derives synthetic spreads from a symbol and its previous quote.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadSynthesizer;

impl SpreadSynthesizer {
    /// Create a synthesizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Spread for `symbol`, given the previously cached quote if any.
    #[must_use]
    pub fn spread(&self, symbol: &str, previous: Option<&Quote>) -> Decimal {
        if symbol.contains("XAU") {
            return GOLD_SPREAD;
        }
        if symbol.contains("XAG") {
            return SILVER_SPREAD;
        }
        if symbol.contains("OIL") || symbol.contains("NGAS") {
            return ENERGY_SPREAD;
        }
        if is_forex_pair(symbol) {
            return if MAJOR_PAIRS.contains(&symbol) {
                MAJOR_SPREAD
            } else {
                CROSS_SPREAD
            };
        }
        if symbol.contains("USDT") {
            let reference = previous.map_or(CRYPTO_FALLBACK_REFERENCE, |q| q.price);
            return reference
                .saturating_mul(CRYPTO_SPREAD_RATE)
                .max(Decimal::ZERO);
        }
        DEFAULT_SPREAD
    }
}

fn is_forex_pair(symbol: &str) -> bool {
    symbol.len() == 6 && (symbol.contains("USD") || instrument::FOREX_SYMBOLS.contains(&symbol))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;
    use crate::domain::quote::PriceUpdate;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn cached(symbol: &str, price: &str) -> Quote {
        Quote::from_update(
            PriceUpdate {
                symbol: symbol.to_string(),
                price: dec(price),
                timestamp: None,
                volume: None,
                direction: None,
            },
            Decimal::ZERO,
        )
        .unwrap()
    }

    #[test_case("EURUSD", "0.00010" ; "major pair")]
    #[test_case("USDJPY", "0.00010" ; "major pair usd base")]
    #[test_case("AUDUSD", "0.00020" ; "usd cross")]
    #[test_case("EURAUD", "0.00020" ; "allow listed cross")]
    #[test_case("XAUUSD", "0.30" ; "gold")]
    #[test_case("XAGUSD", "0.020" ; "silver")]
    #[test_case("USOIL", "0.03" ; "oil")]
    #[test_case("NGAS", "0.03" ; "natural gas")]
    #[test_case("AAPL", "0.01" ; "default")]
    fn spread_table(symbol: &str, expected: &str) {
        let synthesizer = SpreadSynthesizer::new();
        assert_eq!(synthesizer.spread(symbol, None), dec(expected));
    }

    #[test]
    fn crypto_spread_uses_previous_price() {
        let synthesizer = SpreadSynthesizer::new();
        let previous = cached("BTCUSDT", "50000");
        assert_eq!(synthesizer.spread("BTCUSDT", Some(&previous)), dec("5"));
    }

    #[test]
    fn crypto_spread_falls_back_without_previous() {
        let synthesizer = SpreadSynthesizer::new();
        assert_eq!(synthesizer.spread("BTCUSDT", None), dec("0.01"));
    }

    #[test]
    fn commodity_rules_win_over_forex_pair_rule() {
        let synthesizer = SpreadSynthesizer::new();
        // XPTUSD has no commodity rule and falls through to the cross spread
        assert_eq!(synthesizer.spread("XPTUSD", None), dec("0.00020"));
        assert_eq!(synthesizer.spread("XAUUSD", None), dec("0.30"));
    }

    #[test]
    fn spread_is_never_negative_for_allow_listed_symbols() {
        let synthesizer = SpreadSynthesizer::new();
        for symbol in instrument::all_symbols() {
            let previous = cached(symbol, "123.45");
            assert!(synthesizer.spread(symbol, None) >= Decimal::ZERO);
            assert!(synthesizer.spread(symbol, Some(&previous)) >= Decimal::ZERO);
        }
    }
}
