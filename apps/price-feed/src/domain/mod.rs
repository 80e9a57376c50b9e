//! Domain Layer - Core quote and connection types.
//!
//! This layer contains the market data model, the quote cache, spread
//! synthesis and the instrument catalog. Nothing here performs I/O.

/// Static instrument allow-lists, classification and listing metadata.
pub mod instrument;

/// Price updates, quotes and the last-value quote cache.
pub mod quote;

/// Bid/ask synthesis from a single reference price.
pub mod spread;

/// Segments, connection states and status snapshots.
pub mod streaming;
