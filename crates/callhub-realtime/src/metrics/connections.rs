//! Connection metrics helpers.

use std::sync::atomic::Ordering;

use super::RealtimeMetrics;

/// Record a new connection
pub fn record_connect(metrics: &RealtimeMetrics) {
    metrics.connections_total.fetch_add(1, Ordering::Relaxed);
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);
}

/// Record a disconnection
pub fn record_disconnect(metrics: &RealtimeMetrics) {
    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
}

/// Record a connection displaced by a newer one
pub fn record_replaced(metrics: &RealtimeMetrics) {
    metrics.connections_replaced.fetch_add(1, Ordering::Relaxed);
}

/// Record a slow consumer being dropped
pub fn record_backpressure(metrics: &RealtimeMetrics) {
    metrics
        .backpressure_disconnects
        .fetch_add(1, Ordering::Relaxed);
}
