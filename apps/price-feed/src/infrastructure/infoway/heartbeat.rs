//! Heartbeat Manager
//!
//! Schedules application-level keep-alive frames on an open connection and
//! optionally declares the connection dead when nothing is heard from the
//! server within a timeout after a heartbeat was sent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between keep-alive frames.
    pub interval: Duration,
    /// Silence tolerated after a keep-alive before the connection is
    /// considered dead. `None` disables the check.
    pub ack_timeout: Option<Duration>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            ack_timeout: None,
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(interval: Duration, ack_timeout: Option<Duration>) -> Self {
        Self {
            interval,
            ack_timeout,
        }
    }

    /// Create configuration from `WebSocketSettings`.
    #[must_use]
    pub const fn from_websocket_settings(settings: &crate::WebSocketSettings) -> Self {
        Self {
            interval: settings.heartbeat_interval,
            ack_timeout: settings.heartbeat_timeout,
        }
    }
}

/// Events emitted by the heartbeat manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// A keep-alive frame is due.
    SendHeartbeat,
    /// The server stayed silent past the ack timeout.
    Timeout,
}

/// Liveness state shared between the manager and the read loop.
#[derive(Debug)]
pub struct HeartbeatState {
    last_heard: RwLock<Instant>,
    awaiting_ack: AtomicBool,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create new heartbeat state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_heard: RwLock::new(Instant::now()),
            awaiting_ack: AtomicBool::new(false),
        }
    }

    /// Record that any frame arrived from the server.
    pub fn record_activity(&self) {
        *self.last_heard.write() = Instant::now();
        self.awaiting_ack.store(false, Ordering::SeqCst);
    }

    /// Mark that a keep-alive was just written.
    pub fn mark_heartbeat_sent(&self) {
        self.awaiting_ack.store(true, Ordering::SeqCst);
    }

    /// Whether a keep-alive is outstanding.
    #[must_use]
    pub fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack.load(Ordering::SeqCst)
    }

    /// Time since the server was last heard from.
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.last_heard.read().elapsed()
    }
}

/// Periodic keep-alive driver for one connection.
///
/// The first heartbeat fires one full interval after [`run`](Self::run)
/// starts, not immediately.
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    state: Arc<HeartbeatState>,
    event_tx: mpsc::Sender<HeartbeatEvent>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        state: Arc<HeartbeatState>,
        event_tx: mpsc::Sender<HeartbeatEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            state,
            event_tx,
            cancel,
        }
    }

    /// Run until cancelled, the receiver is dropped, or a timeout fires.
    pub async fn run(self) {
        let start = tokio::time::Instant::now() + self.config.interval;
        let mut interval = tokio::time::interval_at(start, self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Heartbeat manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` when the loop should exit.
    async fn tick(&self) -> bool {
        if let Some(timeout) = self.config.ack_timeout {
            let silence = self.state.silence();
            if self.state.is_awaiting_ack() && silence > timeout {
                tracing::warn!(
                    silence_ms = silence.as_millis(),
                    timeout_ms = timeout.as_millis(),
                    "Heartbeat ack timeout"
                );
                let _ = self.event_tx.send(HeartbeatEvent::Timeout).await;
                return false;
            }
        }

        if self.event_tx.send(HeartbeatEvent::SendHeartbeat).await.is_err() {
            tracing::debug!("Event channel closed, stopping heartbeat");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert!(config.ack_timeout.is_none());
    }

    #[test]
    fn activity_clears_outstanding_heartbeat() {
        let state = HeartbeatState::new();
        state.mark_heartbeat_sent();
        assert!(state.is_awaiting_ack());

        state.record_activity();
        assert!(!state.is_awaiting_ack());
        assert!(state.silence() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn first_heartbeat_waits_one_interval() {
        let config = HeartbeatConfig::new(Duration::from_millis(80), None);
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let handle = tokio::spawn(HeartbeatManager::new(config, state, event_tx, cancel.clone()).run());

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .expect("should receive event")
            .expect("channel should not close");

        assert_eq!(event, HeartbeatEvent::SendHeartbeat);
        assert!(started.elapsed() >= Duration::from_millis(70));

        cancel.cancel();
        handle.await.expect("task should complete");
    }

    #[tokio::test]
    async fn silence_past_timeout_is_reported() {
        let config =
            HeartbeatConfig::new(Duration::from_millis(30), Some(Duration::from_millis(50)));
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        state.mark_heartbeat_sent();
        *state.last_heard.write() = Instant::now()
            .checked_sub(Duration::from_millis(200))
            .unwrap();

        let handle = tokio::spawn(HeartbeatManager::new(config, state, event_tx, cancel.clone()).run());

        let mut timed_out = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(500), event_rx.recv()).await
        {
            if event == HeartbeatEvent::Timeout {
                timed_out = true;
                break;
            }
        }
        assert!(timed_out, "should receive timeout event");

        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_millis(100), handle).await;
    }

    #[tokio::test]
    async fn disabled_timeout_never_fires() {
        let config = HeartbeatConfig::new(Duration::from_millis(20), None);
        let state = Arc::new(HeartbeatState::new());
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        state.mark_heartbeat_sent();
        *state.last_heard.write() = Instant::now()
            .checked_sub(Duration::from_secs(60))
            .unwrap();

        let handle = tokio::spawn(HeartbeatManager::new(config, state, event_tx, cancel.clone()).run());

        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(1), event_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event, HeartbeatEvent::SendHeartbeat);
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn manager_cancellation() {
        let config = HeartbeatConfig::new(Duration::from_secs(10), None);
        let (event_tx, _event_rx) = mpsc::channel(10);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            HeartbeatManager::new(config, Arc::new(HeartbeatState::new()), event_tx, cancel.clone())
                .run(),
        );
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_millis(100), handle).await;
        assert!(result.is_ok(), "manager should shut down on cancellation");
    }
}
