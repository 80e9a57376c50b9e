//! Instrument Catalog
//!
//! Static per-asset-class allow-lists of tradable symbols. These lists are
//! the only subscription input and the only basis for "is this symbol
//! supported"; there is no dynamic instrument discovery.
//!
//! Energy and stocks are empty: energy has no reliable upstream data and
//! stocks would need a third concurrent connection.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::streaming::Segment;

// =============================================================================
// Allow-lists
// =============================================================================

/// Forex pairs.
pub const FOREX_SYMBOLS: &[&str] = &[
    "EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "NZDUSD", "USDCAD", "EURGBP", "EURJPY",
    "GBPJPY", "EURCHF", "EURAUD", "EURCAD", "GBPAUD", "GBPCAD", "AUDCAD", "AUDJPY", "CADJPY",
    "CHFJPY", "NZDJPY",
];

/// Precious metals.
pub const METAL_SYMBOLS: &[&str] = &["XAUUSD", "XAGUSD", "XPTUSD", "XPDUSD"];

/// Energy contracts (disabled).
pub const ENERGY_SYMBOLS: &[&str] = &[];

/// Crypto pairs quoted in USDT.
pub const CRYPTO_SYMBOLS: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "DOTUSDT",
    "LTCUSDT", "LINKUSDT", "SHIBUSDT", "UNIUSDT", "ATOMUSDT", "TRXUSDT", "BCHUSDT", "XLMUSDT",
    "ETCUSDT", "NEARUSDT", "AAVEUSDT", "FTMUSDT", "SANDUSDT", "MANAUSDT", "ARBUSDT", "OPUSDT",
    "SUIUSDT", "APTUSDT", "INJUSDT", "FILUSDT", "ICPUSDT", "MKRUSDT",
];

/// Equities (disabled).
pub const STOCK_SYMBOLS: &[&str] = &[];

const POPULAR_FOREX: &[&str] = &[
    "EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "NZDUSD", "USDCAD", "EURGBP", "EURJPY",
    "GBPJPY", "EURCHF", "EURAUD", "AUDCAD", "AUDJPY", "CADJPY",
];

const POPULAR_CRYPTO: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "DOTUSDT",
    "LTCUSDT", "LINKUSDT", "SHIBUSDT", "UNIUSDT", "ATOMUSDT", "TRXUSDT", "BCHUSDT",
];

/// Listing size used before any quote has arrived.
pub const FALLBACK_LISTING_LEN: usize = 50;

// =============================================================================
// Asset Class
// =============================================================================

/// Asset class of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssetClass {
    /// Currency pairs.
    Forex,
    /// Precious metals.
    Metals,
    /// Energy contracts.
    Energy,
    /// Crypto pairs.
    Crypto,
    /// Equities.
    Stocks,
}

impl AssetClass {
    /// Display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forex => "Forex",
            Self::Metals => "Metals",
            Self::Energy => "Energy",
            Self::Crypto => "Crypto",
            Self::Stocks => "Stocks",
        }
    }

    /// Allow-listed symbols of this class.
    #[must_use]
    pub const fn symbols(self) -> &'static [&'static str] {
        match self {
            Self::Forex => FOREX_SYMBOLS,
            Self::Metals => METAL_SYMBOLS,
            Self::Energy => ENERGY_SYMBOLS,
            Self::Crypto => CRYPTO_SYMBOLS,
            Self::Stocks => STOCK_SYMBOLS,
        }
    }

    const fn popular(self) -> &'static [&'static str] {
        match self {
            Self::Forex => POPULAR_FOREX,
            Self::Metals => METAL_SYMBOLS,
            Self::Crypto => POPULAR_CRYPTO,
            Self::Energy | Self::Stocks => &[],
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Asset class from the allow-lists only.
#[must_use]
pub fn allow_listed_class(symbol: &str) -> Option<AssetClass> {
    [
        AssetClass::Forex,
        AssetClass::Metals,
        AssetClass::Energy,
        AssetClass::Crypto,
        AssetClass::Stocks,
    ]
    .into_iter()
    .find(|class| class.symbols().contains(&symbol))
}

/// Classify a symbol: allow-lists first, then substring heuristics.
///
/// The heuristics are coarse (any symbol of five characters or fewer
/// without `USD` is treated as a stock) and only apply to symbols absent
/// from every allow-list.
#[must_use]
pub fn classify(symbol: &str) -> AssetClass {
    if let Some(class) = allow_listed_class(symbol) {
        return class;
    }
    if ["XAU", "XAG", "XPT", "XPD"].iter().any(|p| symbol.contains(p)) {
        return AssetClass::Metals;
    }
    if ["OIL", "NGAS", "BRENT"].iter().any(|p| symbol.contains(p)) {
        return AssetClass::Energy;
    }
    if ["USDT", "BTC", "ETH"].iter().any(|p| symbol.contains(p)) {
        return AssetClass::Crypto;
    }
    if symbol.len() <= 5 && !symbol.contains("USD") {
        return AssetClass::Stocks;
    }
    AssetClass::Forex
}

/// Whether the symbol is on any allow-list.
#[must_use]
pub fn is_supported(symbol: &str) -> bool {
    allow_listed_class(symbol).is_some()
}

/// Every allow-listed symbol in catalog order.
pub fn all_symbols() -> impl Iterator<Item = &'static str> {
    FOREX_SYMBOLS
        .iter()
        .chain(METAL_SYMBOLS)
        .chain(ENERGY_SYMBOLS)
        .chain(CRYPTO_SYMBOLS)
        .chain(STOCK_SYMBOLS)
        .copied()
}

/// Symbols subscribed on a segment connection.
pub fn segment_symbols(segment: Segment) -> impl Iterator<Item = &'static str> {
    let lists: &'static [&'static [&'static str]] = match segment {
        Segment::Forex => &[FOREX_SYMBOLS, METAL_SYMBOLS, ENERGY_SYMBOLS],
        Segment::Crypto => &[CRYPTO_SYMBOLS],
        Segment::Stocks => &[STOCK_SYMBOLS],
    };
    lists.iter().flat_map(|list| list.iter().copied())
}

// =============================================================================
// Instrument Metadata
// =============================================================================

/// Listing entry for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    /// Instrument symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Asset class.
    pub category: AssetClass,
    /// Price decimal places.
    pub digits: u32,
    /// Units per lot.
    pub contract_size: u32,
    /// Minimum order volume in lots.
    pub min_volume: Decimal,
    /// Maximum order volume in lots.
    pub max_volume: Decimal,
    /// Volume increment in lots.
    pub volume_step: Decimal,
    /// Whether the instrument is featured for its class.
    pub popular: bool,
    /// Whether a live quote is cached.
    pub has_price: bool,
}

impl InstrumentInfo {
    /// Build the listing entry for `symbol`.
    #[must_use]
    pub fn new(symbol: &str, has_price: bool) -> Self {
        let category = classify(symbol);
        Self {
            symbol: symbol.to_string(),
            name: display_name(symbol).to_string(),
            category,
            digits: digits(symbol),
            contract_size: contract_size(symbol),
            min_volume: Decimal::new(1, 2),
            max_volume: Decimal::ONE_HUNDRED,
            volume_step: Decimal::new(1, 2),
            popular: category.popular().contains(&symbol),
            has_price,
        }
    }
}

/// Build the "available instruments" listing.
///
/// Lists allow-listed, non-energy symbols that have a cached quote. Until
/// the first quote arrives, the first allow-listed symbols are returned so
/// the listing is never empty at startup.
#[must_use]
pub fn available_instruments(has_price: impl Fn(&str) -> bool) -> Vec<InstrumentInfo> {
    let candidates: Vec<&str> = all_symbols()
        .filter(|s| !ENERGY_SYMBOLS.contains(s))
        .collect();

    let priced: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|s| has_price(s))
        .collect();

    let listed = if priced.is_empty() {
        candidates.into_iter().take(FALLBACK_LISTING_LEN).collect()
    } else {
        priced
    };

    listed
        .into_iter()
        .map(|symbol| InstrumentInfo::new(symbol, has_price(symbol)))
        .collect()
}

/// Price decimal places for display.
#[must_use]
pub fn digits(symbol: &str) -> u32 {
    if symbol.contains("JPY") {
        return 3;
    }
    match symbol {
        "XAUUSD" => 2,
        "XAGUSD" => 3,
        _ => match classify(symbol) {
            AssetClass::Crypto | AssetClass::Stocks => 2,
            _ => 5,
        },
    }
}

/// Units per lot.
#[must_use]
pub fn contract_size(symbol: &str) -> u32 {
    match classify(symbol) {
        AssetClass::Crypto => 1,
        AssetClass::Metals => 100,
        AssetClass::Energy => 1_000,
        AssetClass::Forex | AssetClass::Stocks => 100_000,
    }
}

/// Human-readable instrument name; unknown symbols map to themselves.
#[must_use]
pub fn display_name(symbol: &str) -> &str {
    match symbol {
        "EURUSD" => "EUR/USD",
        "GBPUSD" => "GBP/USD",
        "USDJPY" => "USD/JPY",
        "USDCHF" => "USD/CHF",
        "AUDUSD" => "AUD/USD",
        "NZDUSD" => "NZD/USD",
        "USDCAD" => "USD/CAD",
        "EURGBP" => "EUR/GBP",
        "EURJPY" => "EUR/JPY",
        "GBPJPY" => "GBP/JPY",
        "EURCHF" => "EUR/CHF",
        "EURAUD" => "EUR/AUD",
        "EURCAD" => "EUR/CAD",
        "GBPAUD" => "GBP/AUD",
        "GBPCAD" => "GBP/CAD",
        "AUDCAD" => "AUD/CAD",
        "AUDJPY" => "AUD/JPY",
        "CADJPY" => "CAD/JPY",
        "CHFJPY" => "CHF/JPY",
        "NZDJPY" => "NZD/JPY",
        "XAUUSD" => "Gold",
        "XAGUSD" => "Silver",
        "XPTUSD" => "Platinum",
        "XPDUSD" => "Palladium",
        "USOIL" => "US Oil",
        "UKOIL" => "UK Oil",
        "NGAS" => "Natural Gas",
        "BTCUSDT" => "Bitcoin",
        "ETHUSDT" => "Ethereum",
        "BNBUSDT" => "BNB",
        "SOLUSDT" => "Solana",
        "XRPUSDT" => "XRP",
        "ADAUSDT" => "Cardano",
        "DOGEUSDT" => "Dogecoin",
        "DOTUSDT" => "Polkadot",
        "LTCUSDT" => "Litecoin",
        "LINKUSDT" => "Chainlink",
        "SHIBUSDT" => "Shiba Inu",
        "UNIUSDT" => "Uniswap",
        "ATOMUSDT" => "Cosmos",
        "TRXUSDT" => "TRON",
        "BCHUSDT" => "Bitcoin Cash",
        "XLMUSDT" => "Stellar",
        "ETCUSDT" => "Ethereum Classic",
        "NEARUSDT" => "NEAR Protocol",
        "AAVEUSDT" => "Aave",
        "FTMUSDT" => "Fantom",
        "SANDUSDT" => "The Sandbox",
        "MANAUSDT" => "Decentraland",
        "ARBUSDT" => "Arbitrum",
        "OPUSDT" => "Optimism",
        "SUIUSDT" => "Sui",
        "APTUSDT" => "Aptos",
        "INJUSDT" => "Injective",
        "FILUSDT" => "Filecoin",
        "ICPUSDT" => "Internet Computer",
        "MKRUSDT" => "Maker",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("EURUSD", AssetClass::Forex ; "forex allow list")]
    #[test_case("XAGUSD", AssetClass::Metals ; "metal allow list")]
    #[test_case("DOGEUSDT", AssetClass::Crypto ; "crypto allow list")]
    #[test_case("XAUEUR", AssetClass::Metals ; "metal pattern")]
    #[test_case("UKOIL", AssetClass::Energy ; "energy pattern")]
    #[test_case("BRENT", AssetClass::Energy ; "brent pattern")]
    #[test_case("PEPEUSDT", AssetClass::Crypto ; "usdt pattern")]
    #[test_case("ETHBTC", AssetClass::Crypto ; "btc pattern")]
    #[test_case("AAPL", AssetClass::Stocks ; "short symbol")]
    #[test_case("USDSGD", AssetClass::Forex ; "forex fallback")]
    #[test_case("USDX", AssetClass::Forex ; "short usd symbol")]
    fn classification(symbol: &str, expected: AssetClass) {
        assert_eq!(classify(symbol), expected);
    }

    #[test]
    fn supported_only_for_allow_listed() {
        assert!(is_supported("EURUSD"));
        assert!(is_supported("MKRUSDT"));
        assert!(!is_supported("USDSGD"));
        assert!(!is_supported("ZZZUNKNOWN"));
    }

    #[test]
    fn allow_lists_do_not_overlap() {
        let all: Vec<&str> = all_symbols().collect();
        let mut deduped = all.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(all.len(), deduped.len());
        assert_eq!(all.len(), 54);
    }

    #[test]
    fn segment_symbol_sets() {
        assert_eq!(segment_symbols(Segment::Forex).count(), 24);
        assert_eq!(segment_symbols(Segment::Crypto).count(), 30);
        assert_eq!(segment_symbols(Segment::Stocks).count(), 0);
    }

    #[test_case("USDJPY", 3 ; "jpy pair")]
    #[test_case("XAUUSD", 2 ; "gold")]
    #[test_case("XAGUSD", 3 ; "silver")]
    #[test_case("BTCUSDT", 2 ; "crypto")]
    #[test_case("EURUSD", 5 ; "forex")]
    #[test_case("XPTUSD", 5 ; "platinum")]
    fn digits_per_symbol(symbol: &str, expected: u32) {
        assert_eq!(digits(symbol), expected);
    }

    #[test]
    fn contract_sizes() {
        assert_eq!(contract_size("BTCUSDT"), 1);
        assert_eq!(contract_size("XAUUSD"), 100);
        assert_eq!(contract_size("USOIL"), 1_000);
        assert_eq!(contract_size("EURUSD"), 100_000);
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("XAUUSD"), "Gold");
        assert_eq!(display_name("EURUSD"), "EUR/USD");
        assert_eq!(display_name("ZZZ"), "ZZZ");
    }

    #[test]
    fn listing_falls_back_before_first_quote() {
        let listing = available_instruments(|_| false);
        assert_eq!(listing.len(), FALLBACK_LISTING_LEN);
        assert_eq!(listing[0].symbol, "EURUSD");
        assert!(listing.iter().all(|i| !i.has_price));
    }

    #[test]
    fn listing_filters_to_priced_symbols() {
        let listing = available_instruments(|s| s == "EURUSD" || s == "BTCUSDT");
        let symbols: Vec<&str> = listing.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["EURUSD", "BTCUSDT"]);
        assert!(listing.iter().all(|i| i.has_price));
        assert_eq!(listing[1].category, AssetClass::Crypto);
        assert!(listing[1].popular);
    }

    #[test]
    fn listing_ignores_priced_symbols_off_the_allow_lists() {
        let listing = available_instruments(|s| s == "ZZZUNKNOWN");
        assert_eq!(listing.len(), FALLBACK_LISTING_LEN);
    }

    #[test]
    fn instrument_info_serializes_camel_case() {
        let info = InstrumentInfo::new("EURUSD", true);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["contractSize"], 100_000);
        assert_eq!(json["category"], "Forex");
        assert_eq!(json["hasPrice"], true);
        assert_eq!(json["popular"], true);
    }
}
