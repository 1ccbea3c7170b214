//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Counts of ticks received, delivered, and dropped
//! - **Connection**: Reconnection attempts and decode failures
//! - **Subscriptions**: Active subscription key count

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
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
    // Tick counters
    describe_counter!(
        "tickstream_ticks_received_total",
        "Total ticks received from the quote gateway"
    );
    describe_counter!(
        "tickstream_ticks_delivered_total",
        "Total tick deliveries to consumers"
    );
    describe_counter!(
        "tickstream_ticks_dropped_total",
        "Total tick deliveries dropped, by reason"
    );

    // Connection counters
    describe_counter!(
        "tickstream_decode_errors_total",
        "Total gateway frames dropped because they failed to decode"
    );
    describe_counter!(
        "tickstream_reconnects_total",
        "Total gateway reconnection attempts"
    );

    // Subscription gauges
    describe_gauge!(
        "tickstream_active_subscriptions",
        "Number of distinct (symbol, market) keys with at least one consumer"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Reason a tick delivery was dropped.
#[derive(Debug, Clone, Copy)]
pub enum DropReason {
    /// Consumer channel was full.
    Full,
    /// Consumer receiver was dropped.
    Closed,
}

impl DropReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Closed => "closed",
        }
    }
}

/// Record a tick received from the gateway.
pub fn record_tick_received(market: &'static str) {
    counter!(
        "tickstream_ticks_received_total",
        "market" => market
    )
    .increment(1);
}

/// Record tick deliveries to consumers.
pub fn record_ticks_delivered(count: u64) {
    counter!("tickstream_ticks_delivered_total").increment(count);
}

/// Record tick deliveries dropped for a slow or departed consumer.
pub fn record_ticks_dropped(reason: DropReason, count: u64) {
    counter!(
        "tickstream_ticks_dropped_total",
        "reason" => reason.as_str()
    )
    .increment(count);
}

/// Record a gateway frame that failed to decode.
pub fn record_decode_error() {
    counter!("tickstream_decode_errors_total").increment(1);
}

/// Record a gateway reconnection attempt.
pub fn record_reconnect() {
    counter!("tickstream_reconnects_total").increment(1);
}

/// Update the active subscription key count.
pub fn set_active_subscriptions(count: f64) {
    gauge!("tickstream_active_subscriptions").set(count);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_reason_as_str() {
        assert_eq!(DropReason::Full.as_str(), "full");
        assert_eq!(DropReason::Closed.as_str(), "closed");
    }
}
