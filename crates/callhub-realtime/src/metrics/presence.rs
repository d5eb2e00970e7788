//! Presence metrics helpers.

use std::sync::atomic::Ordering;

use super::RealtimeMetrics;

/// Record presence entries evicted by a sweep
pub fn record_evictions(metrics: &RealtimeMetrics, count: usize) {
    metrics
        .presence_evictions
        .fetch_add(count as u64, Ordering::Relaxed);
}
