//! Call lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Call state machine and room settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Seconds a call may ring before it is marked missed.
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: u64,
    /// Maximum participants per room.
    #[serde(default = "default_max_participants")]
    pub max_room_participants: usize,
    /// Default page size for call history queries.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ring_timeout_seconds: default_ring_timeout(),
            max_room_participants: default_max_participants(),
            history_limit: default_history_limit(),
        }
    }
}

impl CallConfig {
    /// Ring timeout as a [`Duration`].
    pub fn ring_timeout(&self) -> Duration {
        Duration::from_secs(self.ring_timeout_seconds)
    }
}

fn default_ring_timeout() -> u64 {
    45
}

fn default_max_participants() -> usize {
    10
}

fn default_history_limit() -> u32 {
    50
}
