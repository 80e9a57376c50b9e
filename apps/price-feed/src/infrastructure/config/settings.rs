//! Feed Configuration Settings
//!
//! Configuration types for the price feed, loaded from environment variables.

use std::time::Duration;

use crate::domain::streaming::Segment;

/// Default upstream host.
pub const DEFAULT_HOST: &str = "data.infoway.io";

/// Infoway API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the raw key.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketSettings {
    /// Delay between open and the subscribe request.
    pub subscribe_delay: Duration,
    /// Keep-alive interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated after a keep-alive (`None` = disabled).
    pub heartbeat_timeout: Option<Duration>,
    /// Flat delay before each reconnection attempt.
    pub reconnect_delay: Duration,
    /// Maximum consecutive reconnection attempts (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Start offset applied per segment index.
    pub segment_stagger: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            subscribe_delay: Duration::from_millis(1_000),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: None,
            reconnect_delay: Duration::from_millis(5_000),
            max_reconnect_attempts: 10,
            segment_stagger: Duration::from_millis(2_000),
        }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSettings {
    /// Capacity of the quote update channel.
    pub quote_updates_capacity: usize,
    /// Capacity of the feed event channel.
    pub events_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            quote_updates_capacity: 10_000,
            events_capacity: 256,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Upstream API key. Without it the feed stays inactive.
    pub api_key: Option<ApiKey>,
    /// Upstream host.
    pub host: String,
    /// Segments to connect, in start order.
    pub segments: Vec<Segment>,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_HOST.to_string(),
            segments: vec![Segment::Forex, Segment::Crypto],
            websocket: WebSocketSettings::default(),
            broadcast: BroadcastSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_FEED_SEGMENTS` names an unknown segment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_FEED_SEGMENTS` names an unknown segment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader(lookup);
        let defaults = Self::default();

        let api_key = env
            .get("INFOWAY_API_KEY")
            .filter(|k| !k.is_empty())
            .map(ApiKey::new);

        let host = env
            .get("INFOWAY_HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);

        let segments = match env.get("PRICE_FEED_SEGMENTS") {
            Some(raw) => parse_segments(&raw)?,
            None => defaults.segments,
        };

        let ws = defaults.websocket;
        let websocket = WebSocketSettings {
            subscribe_delay: env.millis("PRICE_FEED_SUBSCRIBE_DELAY_MS", ws.subscribe_delay),
            heartbeat_interval: env.secs("PRICE_FEED_HEARTBEAT_INTERVAL_SECS", ws.heartbeat_interval),
            heartbeat_timeout: env
                .parse::<u64>("PRICE_FEED_HEARTBEAT_TIMEOUT_SECS")
                .map_or(ws.heartbeat_timeout, |secs| {
                    (secs > 0).then(|| Duration::from_secs(secs))
                }),
            reconnect_delay: env.millis("PRICE_FEED_RECONNECT_DELAY_MS", ws.reconnect_delay),
            max_reconnect_attempts: env
                .parse("PRICE_FEED_MAX_RECONNECT_ATTEMPTS")
                .unwrap_or(ws.max_reconnect_attempts),
            segment_stagger: env.millis("PRICE_FEED_SEGMENT_STAGGER_MS", ws.segment_stagger),
        };

        let broadcast = BroadcastSettings {
            quote_updates_capacity: env
                .parse("PRICE_FEED_QUOTE_UPDATES_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(defaults.broadcast.quote_updates_capacity),
            events_capacity: env
                .parse("PRICE_FEED_EVENTS_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(defaults.broadcast.events_capacity),
        };

        let server = ServerSettings {
            health_port: env
                .parse("PRICE_FEED_HEALTH_PORT")
                .unwrap_or(defaults.server.health_port),
        };

        Ok(Self {
            api_key,
            host,
            segments,
            websocket,
            broadcast,
            server,
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Stream URL for `segment`, or `None` without an API key.
    #[must_use]
    pub fn endpoint_url(&self, segment: Segment) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            format!(
                "wss://{}/ws?business={}&apikey={}",
                self.host,
                segment.business(),
                key.expose()
            )
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A segment name was not recognised.
    #[error("unknown segment in PRICE_FEED_SEGMENTS: {0}")]
    UnknownSegment(String),
}

fn parse_segments(raw: &str) -> Result<Vec<Segment>, ConfigError> {
    let mut segments = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let segment =
            Segment::parse(name).ok_or_else(|| ConfigError::UnknownSegment(name.to_string()))?;
        if !segments.contains(&segment) {
            segments.push(segment);
        }
    }
    Ok(segments)
}

struct EnvReader<F>(F);

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.parse::<u64>(key).map_or(default, Duration::from_secs)
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        self.parse::<u64>(key).map_or(default, Duration::from_millis)
    }
}
