//! Prometheus Metrics Module
//!
//! Exposes feed metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Frames**: upstream frames received and dropped per segment
//! - **Quotes**: cache writes and cached symbol count
//! - **Connections**: per-segment connection gauge, reconnects, upstream errors
//! - **Latency**: frame processing time
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::streaming::Segment;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, or return the already installed handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "price_feed_frames_received_total",
        "Total frames received from upstream"
    );
    describe_counter!(
        "price_feed_frames_dropped_total",
        "Total frames dropped by the decoder, by reason"
    );
    describe_counter!(
        "price_feed_quotes_updated_total",
        "Total quote cache writes"
    );
    describe_counter!(
        "price_feed_upstream_errors_total",
        "Total error frames reported by upstream"
    );
    describe_counter!(
        "price_feed_reconnects_total",
        "Total reconnection attempts scheduled"
    );

    describe_gauge!(
        "price_feed_segment_connected",
        "1 while the segment connection is open"
    );
    describe_gauge!("price_feed_cached_symbols", "Symbols with a cached quote");

    describe_histogram!(
        "price_feed_frame_processing_seconds",
        "Time from frame receipt to cache write and broadcast"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a frame received on `segment`.
pub fn record_frame_received(segment: Segment) {
    counter!(
        "price_feed_frames_received_total",
        "segment" => segment.as_str()
    )
    .increment(1);
}

/// Record a frame dropped by the decoder.
pub fn record_frame_dropped(segment: Segment, reason: &'static str) {
    counter!(
        "price_feed_frames_dropped_total",
        "segment" => segment.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a quote cache write.
pub fn record_quote_updated(segment: Segment) {
    counter!(
        "price_feed_quotes_updated_total",
        "segment" => segment.as_str()
    )
    .increment(1);
}

/// Record an upstream error frame.
pub fn record_upstream_error(segment: Segment, code: i64) {
    counter!(
        "price_feed_upstream_errors_total",
        "segment" => segment.as_str(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect(segment: Segment) {
    counter!(
        "price_feed_reconnects_total",
        "segment" => segment.as_str()
    )
    .increment(1);
}

/// Update the connection gauge for `segment`.
pub fn set_segment_connected(segment: Segment, connected: bool) {
    gauge!(
        "price_feed_segment_connected",
        "segment" => segment.as_str()
    )
    .set(if connected { 1.0 } else { 0.0 });
}

/// Update the cached symbol gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_cached_symbols(count: usize) {
    gauge!("price_feed_cached_symbols").set(count as f64);
}

/// Record frame processing duration.
pub fn record_processing_duration(segment: Segment, duration: Duration) {
    histogram!(
        "price_feed_frame_processing_seconds",
        "segment" => segment.as_str()
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_frame_received(Segment::Forex);
        record_frame_dropped(Segment::Crypto, "malformed");
        record_upstream_error(Segment::Forex, -1);
        set_segment_connected(Segment::Forex, true);
        set_cached_symbols(3);
        record_processing_duration(Segment::Crypto, Duration::from_micros(40));
    }

    #[test]
    fn handle_is_absent_before_init() {
        // Other tests never install a recorder.
        assert!(get_metrics_handle().is_none());
    }
}
