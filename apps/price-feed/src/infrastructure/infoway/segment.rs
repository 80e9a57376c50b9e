//! Segment WebSocket Client
//!
//! One client per market segment. The client owns the connection loop:
//! connect, subscribe after a settle delay, keep the link alive with
//! heartbeats, route inbound frames, and reconnect with a bounded flat
//! delay when the link drops.
//!
//! # Stream URL
//!
//! `wss://data.infoway.io/ws?business={common|crypto|stock}&apikey={key}`

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, IgnoreReason, InboundFrame, InfowayCodec};
use super::heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
use super::messages::{HeartbeatRequest, SubscribeRequest};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::application::ports::QuoteSink;
use crate::domain::streaming::{ConnectionState, Segment, SegmentStatus};
use crate::infrastructure::broadcast::{FeedEvent, SharedBroadcastHub};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end a segment connection.
#[derive(Debug, thiserror::Error)]
pub enum SegmentClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Server closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Server went silent past the heartbeat timeout.
    #[error("heartbeat timeout")]
    HeartbeatTimeout,

    /// Reconnect attempts exhausted.
    #[error("maximum reconnection attempts ({0}) exceeded")]
    MaxReconnectAttemptsExceeded(u32),
}

// =============================================================================
// Connection Record
// =============================================================================

/// Live state of one segment connection, shared with the status facade.
#[derive(Debug)]
pub struct SegmentConnection {
    segment: Segment,
    state: RwLock<ConnectionState>,
    reconnect_attempts: AtomicU32,
    frames_received: AtomicU64,
    subscribed: RwLock<Vec<String>>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl SegmentConnection {
    /// Create a disconnected record.
    #[must_use]
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            state: RwLock::new(ConnectionState::Disconnected),
            reconnect_attempts: AtomicU32::new(0),
            frames_received: AtomicU64::new(0),
            subscribed: RwLock::new(Vec::new()),
            last_connected_at: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Segment this record describes.
    #[must_use]
    pub const fn segment(&self) -> Segment {
        self.segment
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Consecutive reconnect attempts since the last open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Frames received over the record's lifetime.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Symbols in the subscription set.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.subscribed.read().clone()
    }

    /// Replace the subscription set.
    pub fn set_subscribed_symbols(&self, symbols: Vec<String>) {
        *self.subscribed.write() = symbols;
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        metrics::set_segment_connected(self.segment, state.is_open());
    }

    fn record_open(&self) {
        *self.last_connected_at.write() = Some(Utc::now());
        self.reconnect_attempts.store(0, Ordering::Relaxed);
        self.set_state(ConnectionState::Open);
    }

    fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, error: String) {
        *self.last_error.write() = Some(error);
    }

    /// Mark the segment stopped after its task ended abnormally.
    pub fn record_task_failure(&self, reason: String) {
        self.record_error(reason);
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_reconnect_attempts(&self, attempts: u32) {
        self.reconnect_attempts.store(attempts, Ordering::Relaxed);
    }

    /// Point-in-time status.
    #[must_use]
    pub fn status(&self) -> SegmentStatus {
        let state = self.state();
        SegmentStatus {
            segment: self.segment,
            state,
            connected: state.is_open(),
            reconnect_attempts: self.reconnect_attempts(),
            frames_received: self.frames_received(),
            subscribed_symbols: self.subscribed.read().len(),
            last_connected_at: *self.last_connected_at.read(),
            last_error: self.last_error.read().clone(),
        }
    }
}

// =============================================================================
// Segment Client Configuration
// =============================================================================

/// Configuration for one segment client.
#[derive(Debug, Clone)]
pub struct SegmentClientConfig {
    /// Segment served.
    pub segment: Segment,
    /// Full stream URL including credentials.
    pub url: String,
    /// Symbols to subscribe on every open.
    pub symbols: Vec<String>,
    /// Delay before the first connection attempt.
    pub start_delay: Duration,
    /// Delay between open and the subscribe request.
    pub subscribe_delay: Duration,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
}

impl SegmentClientConfig {
    /// Create a configuration with default timings.
    #[must_use]
    pub fn new(segment: Segment, url: String, symbols: Vec<String>) -> Self {
        Self {
            segment,
            url,
            symbols,
            start_delay: Duration::ZERO,
            subscribe_delay: Duration::from_millis(1_000),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Apply timings from `WebSocketSettings`.
    #[must_use]
    pub fn with_websocket_settings(mut self, settings: &crate::WebSocketSettings) -> Self {
        self.subscribe_delay = settings.subscribe_delay;
        self.reconnect = ReconnectConfig::from_websocket_settings(settings);
        self.heartbeat = HeartbeatConfig::from_websocket_settings(settings);
        self
    }

    /// Delay the first connection attempt.
    #[must_use]
    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }
}

// =============================================================================
// Segment Client
// =============================================================================

/// WebSocket client for one Infoway segment.
pub struct SegmentClient {
    config: SegmentClientConfig,
    codec: InfowayCodec,
    connection: Arc<SegmentConnection>,
    sink: Arc<dyn QuoteSink>,
    hub: SharedBroadcastHub,
    cancel: CancellationToken,
}

impl SegmentClient {
    /// Create a new segment client.
    #[must_use]
    pub fn new(
        config: SegmentClientConfig,
        connection: Arc<SegmentConnection>,
        sink: Arc<dyn QuoteSink>,
        hub: SharedBroadcastHub,
        cancel: CancellationToken,
    ) -> Self {
        connection.set_subscribed_symbols(config.symbols.clone());
        Self {
            config,
            codec: InfowayCodec::new(),
            connection,
            sink,
            hub,
            cancel,
        }
    }

    /// Run the connection loop until cancelled or reconnects are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentClientError::MaxReconnectAttemptsExceeded`] when the
    /// attempt bound is reached; the segment stays disconnected afterwards.
    pub async fn run(self: Arc<Self>) -> Result<(), SegmentClientError> {
        let segment = self.config.segment;

        if !self.config.start_delay.is_zero() {
            tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.config.start_delay) => {}
            }
        }

        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                self.connection.set_state(ConnectionState::Disconnected);
                tracing::info!(segment = %segment, "Segment client cancelled");
                return Ok(());
            }

            let result = self.connect_and_run(&mut policy).await;
            self.connection.set_state(ConnectionState::Disconnected);

            let error = match result {
                Ok(()) => {
                    tracing::info!(segment = %segment, "Segment connection closed on shutdown");
                    return Ok(());
                }
                Err(e) => e,
            };

            tracing::warn!(segment = %segment, error = %error, "Segment connection lost");
            self.connection.record_error(error.to_string());
            let _ = self.hub.send_event(FeedEvent::Disconnected {
                segment,
                reason: error.to_string(),
            });

            let Some(delay) = policy.next_delay() else {
                let attempts = policy.attempt_count();
                tracing::error!(
                    segment = %segment,
                    attempts,
                    "Reconnect attempts exhausted, segment stays disconnected"
                );
                let _ = self.hub.send_event(FeedEvent::GaveUp { segment, attempts });
                return Err(SegmentClientError::MaxReconnectAttemptsExceeded(attempts));
            };

            let attempt = policy.attempt_count();
            self.connection.set_reconnect_attempts(attempt);
            metrics::record_reconnect(segment);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            tracing::info!(segment = %segment, attempt, delay_ms, "Reconnecting");
            let _ = self.hub.send_event(FeedEvent::Reconnecting {
                segment,
                attempt,
                delay_ms,
            });

            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.connection.set_state(ConnectionState::Disconnected);
                    tracing::info!(segment = %segment, "Segment client cancelled during reconnect delay");
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Connect and serve one connection until it drops or is cancelled.
    ///
    /// `Ok(())` means the close was requested through the cancel token.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), SegmentClientError> {
        let segment = self.config.segment;
        self.connection.set_state(ConnectionState::Connecting);
        tracing::info!(segment = %segment, symbols = self.config.symbols.len(), "Connecting to Infoway stream");

        let (ws_stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            result = tokio_tungstenite::connect_async(self.config.url.as_str()) => result?,
        };

        policy.reset();
        self.connection.record_open();
        tracing::info!(segment = %segment, "Infoway stream connected");
        let _ = self.hub.send_event(FeedEvent::Connected { segment });

        let (mut write, mut read) = ws_stream.split();

        // Heartbeat lives exactly as long as this connection.
        let heartbeat_cancel = self.cancel.child_token();
        let _heartbeat_guard = heartbeat_cancel.clone().drop_guard();
        let heartbeat_state = Arc::new(HeartbeatState::new());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel::<HeartbeatEvent>(4);
        tokio::spawn(
            HeartbeatManager::new(
                self.config.heartbeat.clone(),
                Arc::clone(&heartbeat_state),
                heartbeat_tx,
                heartbeat_cancel,
            )
            .run(),
        );
        let mut heartbeat_alive = true;

        let mut subscribe_timer = pin!(tokio::time::sleep(self.config.subscribe_delay));
        let mut subscribe_pending = !self.config.symbols.is_empty();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.connection.set_state(ConnectionState::Closing);
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                () = &mut subscribe_timer, if subscribe_pending => {
                    subscribe_pending = false;
                    let request = SubscribeRequest::new(&self.config.symbols);
                    write.send(Message::Text(self.codec.encode(&request)?.into())).await?;
                    tracing::info!(
                        segment = %segment,
                        symbols = request.symbol_count(),
                        trace = %request.trace,
                        "Subscription request sent"
                    );
                    let _ = self.hub.send_event(FeedEvent::SubscriptionSent {
                        segment,
                        symbols: request.symbol_count(),
                    });
                }
                event = heartbeat_rx.recv(), if heartbeat_alive => match event {
                    Some(HeartbeatEvent::SendHeartbeat) => {
                        let request = HeartbeatRequest::new();
                        write.send(Message::Text(self.codec.encode(&request)?.into())).await?;
                        heartbeat_state.mark_heartbeat_sent();
                        tracing::debug!(segment = %segment, trace = %request.trace, "Heartbeat sent");
                    }
                    Some(HeartbeatEvent::Timeout) => return Err(SegmentClientError::HeartbeatTimeout),
                    None => heartbeat_alive = false,
                },
                msg = read.next() => match msg {
                    Some(Ok(Message::Ping(data))) => {
                        heartbeat_state.record_activity();
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) => heartbeat_state.record_activity(),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(segment = %segment, frame = ?frame, "Server sent close frame");
                        return Err(SegmentClientError::ConnectionClosed);
                    }
                    Some(Ok(message)) => {
                        heartbeat_state.record_activity();
                        self.handle_message(&message);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        tracing::info!(segment = %segment, "WebSocket stream ended");
                        return Err(SegmentClientError::ConnectionClosed);
                    }
                },
            }
        }
    }

    /// Route one data frame. Never fails: bad frames are counted and dropped.
    fn handle_message(&self, message: &Message) {
        let segment = self.config.segment;
        let started = Instant::now();
        self.connection.record_frame();
        metrics::record_frame_received(segment);

        match self.codec.decode(message) {
            InboundFrame::Price(update) => {
                if self.sink.accept(segment, update).is_some() {
                    metrics::record_processing_duration(segment, started.elapsed());
                } else {
                    metrics::record_frame_dropped(segment, IgnoreReason::InvalidPrice.as_str());
                }
            }
            InboundFrame::SubscriptionAck { message } => {
                tracing::info!(segment = %segment, message = ?message, "Subscription acknowledged");
                let _ = self.hub.send_event(FeedEvent::Subscribed { segment, message });
            }
            InboundFrame::HeartbeatAck => {
                tracing::trace!(segment = %segment, "Heartbeat acknowledged");
            }
            InboundFrame::Error { code, message } => {
                tracing::warn!(segment = %segment, code, message = %message, "Upstream error frame");
                metrics::record_upstream_error(segment, code);
                let _ = self.hub.send_event(FeedEvent::UpstreamError {
                    segment,
                    code,
                    message,
                });
            }
            InboundFrame::Ignored(reason) => {
                tracing::debug!(segment = %segment, reason = %reason, "Frame dropped");
                metrics::record_frame_dropped(segment, reason.as_str());
            }
        }
    }

    /// Shared connection record.
    #[must_use]
    pub fn connection(&self) -> Arc<SegmentConnection> {
        Arc::clone(&self.connection)
    }
}
