//! Application Services
//!
//! - `QuoteIngestor`: applies validated price updates to the cache and
//!   publishes them
//! - `PriceFeedService`: segment lifecycle plus the read-only query facade

mod ingest;
mod price_feed;

pub use ingest::QuoteIngestor;
pub use price_feed::{PriceCacheView, PriceFeedService};
