//! Call metrics helpers.

use std::sync::atomic::Ordering;

use super::RealtimeMetrics;

/// Record a created call
pub fn record_created(metrics: &RealtimeMetrics) {
    metrics.calls_created.fetch_add(1, Ordering::Relaxed);
}

/// Record a call reaching a terminal state
pub fn record_completed(metrics: &RealtimeMetrics, missed: bool) {
    metrics.calls_completed.fetch_add(1, Ordering::Relaxed);
    if missed {
        metrics.calls_missed.fetch_add(1, Ordering::Relaxed);
    }
}
