//! Realtime engine metrics.

pub mod calls;
pub mod connections;
pub mod messages;
pub mod presence;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Connections currently registered
    pub connections_active: AtomicU64,
    /// Connections replaced by a newer one for the same user
    pub connections_replaced: AtomicU64,
    /// Total messages received from clients
    pub messages_received: AtomicU64,
    /// Total messages queued for clients
    pub messages_sent: AtomicU64,
    /// Deliveries that found no live connection
    pub delivery_failures: AtomicU64,
    /// Connections dropped because their outbound queue was full
    pub backpressure_disconnects: AtomicU64,
    /// Inbound frames rejected as malformed
    pub protocol_errors: AtomicU64,
    /// Calls created
    pub calls_created: AtomicU64,
    /// Calls that reached a terminal state
    pub calls_completed: AtomicU64,
    /// Calls that timed out while ringing
    pub calls_missed: AtomicU64,
    /// Presence entries removed by the sweep
    pub presence_evictions: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_replaced: self.connections_replaced.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            backpressure_disconnects: self.backpressure_disconnects.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            calls_created: self.calls_created.load(Ordering::Relaxed),
            calls_completed: self.calls_completed.load(Ordering::Relaxed),
            calls_missed: self.calls_missed.load(Ordering::Relaxed),
            presence_evictions: self.presence_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Connections replaced by a newer session
    pub connections_replaced: u64,
    /// Total messages received
    pub messages_received: u64,
    /// Total messages sent
    pub messages_sent: u64,
    /// Deliveries to users without a live connection
    pub delivery_failures: u64,
    /// Slow consumers disconnected
    pub backpressure_disconnects: u64,
    /// Malformed inbound frames
    pub protocol_errors: u64,
    /// Calls created
    pub calls_created: u64,
    /// Calls finished (ended, declined, or missed)
    pub calls_completed: u64,
    /// Calls missed after ringing out
    pub calls_missed: u64,
    /// Presence sweep evictions
    pub presence_evictions: u64,
}
