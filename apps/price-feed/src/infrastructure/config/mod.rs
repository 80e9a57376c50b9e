//! Configuration Module
//!
//! Configuration loading for the price feed service.

mod settings;

pub use settings::{
    ApiKey, BroadcastSettings, ConfigError, DEFAULT_HOST, FeedConfig, ServerSettings,
    WebSocketSettings,
};
