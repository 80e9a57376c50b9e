//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and the port interfaces
//! through which infrastructure adapters reach them.

/// Port interfaces (quote sink, price query).
pub mod ports;

/// Quote ingestion and the price feed facade.
pub mod services;
