//! Message metrics helpers.

use std::sync::atomic::Ordering;

use super::RealtimeMetrics;

/// Record a message queued for a client
pub fn record_sent(metrics: &RealtimeMetrics) {
    metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
}

/// Record a message received from a client
pub fn record_received(metrics: &RealtimeMetrics) {
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
}

/// Record a delivery with no live target
pub fn record_undeliverable(metrics: &RealtimeMetrics) {
    metrics.delivery_failures.fetch_add(1, Ordering::Relaxed);
}

/// Record a malformed inbound frame
pub fn record_protocol_error(metrics: &RealtimeMetrics) {
    metrics.protocol_errors.fetch_add(1, Ordering::Relaxed);
}
