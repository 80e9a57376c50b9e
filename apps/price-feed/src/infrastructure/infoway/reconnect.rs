//! Reconnection Policy
//!
//! Fixed-delay retry with a bounded number of consecutive attempts. The
//! counter is reset by a successful open, so only uninterrupted failure
//! streaks count toward the bound.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before every reconnection attempt.
    pub delay: Duration,
    /// Maximum consecutive attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(5_000),
            max_attempts: 10,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Create configuration from `WebSocketSettings`.
    #[must_use]
    pub const fn from_websocket_settings(settings: &crate::WebSocketSettings) -> Self {
        Self {
            delay: settings.reconnect_delay,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Reconnection policy for one segment connection.
///
/// # Example
///
/// ```rust
/// use price_feed::infrastructure::infoway::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::new(Duration::from_millis(10), 2));
///
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(10)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(10)));
/// assert_eq!(policy.next_delay(), None);
///
/// // A successful open clears the streak
/// policy.reset();
/// assert!(policy.should_retry());
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Schedule the next attempt.
    ///
    /// Returns `None` once the consecutive-attempt bound is reached; the
    /// counter is not advanced in that case.
    #[must_use]
    pub const fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        self.attempt_count += 1;
        Some(self.config.delay)
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Attempts scheduled since the last successful open.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Check if reconnection should continue.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt_count < self.config.max_attempts
    }

    /// Configured attempt bound.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
