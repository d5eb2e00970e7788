//! Background task evicting stale presence entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::tracker::PresenceTracker;

/// Spawn the periodic sweep. Runs until the shutdown signal fires.
pub fn spawn_sweeper(
    tracker: Arc<PresenceTracker>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "Presence sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let evicted = tracker.sweep().await;
                    debug!(evicted = evicted.len(), "Presence sweep finished");
                }
            }
        }

        info!("Presence sweeper stopped");
    })
}
