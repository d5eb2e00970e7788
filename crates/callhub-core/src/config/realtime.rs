//! Real-time signaling engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection-level settings for the signaling engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound queue. A full queue
    /// disconnects the slow consumer.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue_size: usize,
    /// Seconds without outbound traffic before a liveness probe is sent.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Extra seconds granted after the idle timeout for any inbound frame
    /// before the connection is declared dead.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_queue_size: default_outbound_queue(),
            idle_timeout_seconds: default_idle_timeout(),
            probe_timeout_seconds: default_probe_timeout(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl RealtimeConfig {
    /// Idle period after which the write loop probes the peer.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Longest silence the read loop tolerates.
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds + self.probe_timeout_seconds)
    }
}

fn default_outbound_queue() -> usize {
    256
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_max_message_size() -> usize {
    65_536
}
