//! Presence tracker: who is reachable right now.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use callhub_core::config::PresenceConfig;
use callhub_core::result::AppResult;
use callhub_core::traits::UserDirectory;
use callhub_core::types::{ConnectionId, UserId};

use crate::metrics::{self, RealtimeMetrics};

use super::entry::PresenceEntry;
use super::listener::{PresenceChange, PresenceListener};

/// Tracks presence for all users.
///
/// A user is online while their last heartbeat is younger than the
/// heartbeat timeout. Entries that time out are logically offline at once
/// and physically removed by [`sweep`](Self::sweep). Every creation and
/// removal is persisted to the directory and reported to the listener,
/// always with no map lock held.
#[derive(Debug)]
pub struct PresenceTracker {
    /// User ID → presence entry
    entries: DashMap<UserId, PresenceEntry>,
    /// Durable online flag and friend lookups
    directory: Arc<dyn UserDirectory>,
    /// Transition observer
    listener: Arc<dyn PresenceListener>,
    /// Heartbeat timeout
    timeout: Duration,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
}

impl PresenceTracker {
    /// Create a new presence tracker
    pub fn new(
        config: &PresenceConfig,
        directory: Arc<dyn UserDirectory>,
        listener: Arc<dyn PresenceListener>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            directory,
            listener,
            timeout: config.heartbeat_timeout(),
            metrics,
        }
    }

    /// Mark a user as online through `connection_id`.
    ///
    /// Friends are only told when the user was not already online, so a
    /// replacing connection does not announce the user twice.
    pub async fn set_online(&self, user_id: UserId, connection_id: ConnectionId) {
        let entry = PresenceEntry::new(user_id, Some(connection_id));
        let at = entry.last_seen;
        let was_online = self
            .entries
            .insert(user_id, entry)
            .is_some_and(|previous| previous.is_fresh(Instant::now(), self.timeout));

        debug!(user_id = %user_id, conn_id = %connection_id, was_online, "User online");
        self.persist(user_id, true, at).await;
        if !was_online {
            self.emit(user_id, true, at).await;
        }
    }

    /// Refresh a user's heartbeat, creating the entry if it is missing.
    ///
    /// Returns `true` if an entry had to be created.
    pub async fn heartbeat(&self, user_id: UserId, connection_id: Option<ConnectionId>) -> bool {
        let created = match self.entries.entry(user_id) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().refresh();
                None
            }
            Entry::Vacant(entry) => {
                let fresh = PresenceEntry::new(user_id, connection_id);
                let at = fresh.last_seen;
                entry.insert(fresh);
                Some(at)
            }
        };

        match created {
            Some(at) => {
                debug!(user_id = %user_id, "Heartbeat from untracked user, entry created");
                self.persist(user_id, true, at).await;
                self.emit(user_id, true, at).await;
                true
            }
            None => false,
        }
    }

    /// Mark a user as offline.
    ///
    /// Returns `false` if the user had no entry.
    pub async fn set_offline(&self, user_id: UserId) -> bool {
        match self.entries.remove(&user_id) {
            Some(_) => {
                self.went_offline(user_id).await;
                true
            }
            None => false,
        }
    }

    /// Mark a user offline only if their entry belongs to `connection_id`.
    ///
    /// Used on connection teardown so a replaced connection cannot take
    /// down the presence of its successor.
    pub async fn release_connection(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = self
            .entries
            .remove_if(&user_id, |_, entry| entry.connection_id == Some(connection_id))
            .is_some();
        if removed {
            self.went_offline(user_id).await;
        }
        removed
    }

    async fn went_offline(&self, user_id: UserId) {
        let at = Utc::now();
        debug!(user_id = %user_id, "User offline");
        self.persist(user_id, false, at).await;
        self.emit(user_id, false, at).await;
    }

    /// Check if a user is online right now.
    pub fn is_online(&self, user_id: UserId) -> bool {
        let now = Instant::now();
        self.entries
            .get(&user_id)
            .is_some_and(|entry| entry.is_fresh(now, self.timeout))
    }

    /// Last heartbeat time of a tracked user.
    pub fn last_seen(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.entries.get(&user_id).map(|entry| entry.last_seen)
    }

    /// Snapshot of a user's entry.
    pub fn entry(&self, user_id: UserId) -> Option<PresenceEntry> {
        self.entries.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Friends of `user_id` that are online right now.
    pub async fn online_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let friends = self.directory.friend_ids(user_id).await?;
        Ok(friends
            .into_iter()
            .filter(|friend| self.is_online(*friend))
            .collect())
    }

    /// Number of users online right now.
    pub fn online_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.is_fresh(now, self.timeout))
            .count()
    }

    /// Evict every entry whose heartbeat timed out.
    ///
    /// Candidates are collected first; each removal re-checks staleness so
    /// a heartbeat landing in between keeps the user online. Returns the
    /// evicted users.
    pub async fn sweep(&self) -> Vec<UserId> {
        let now = Instant::now();
        let candidates: Vec<UserId> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_fresh(now, self.timeout))
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = Vec::with_capacity(candidates.len());
        for user_id in candidates {
            let removed = self
                .entries
                .remove_if(&user_id, |_, entry| !entry.is_fresh(Instant::now(), self.timeout));
            if let Some((_, entry)) = removed {
                evicted.push((user_id, entry.last_seen));
            }
        }

        for (user_id, last_seen) in &evicted {
            self.persist(*user_id, false, *last_seen).await;
            self.emit(*user_id, false, Utc::now()).await;
        }

        if !evicted.is_empty() {
            metrics::presence::record_evictions(&self.metrics, evicted.len());
            info!(count = evicted.len(), "Evicted stale presence entries");
        }

        evicted.into_iter().map(|(user_id, _)| user_id).collect()
    }

    async fn persist(&self, user_id: UserId, online: bool, at: DateTime<Utc>) {
        if let Err(e) = self.directory.set_online(user_id, online, at).await {
            warn!(user_id = %user_id, online, error = %e, "Failed to persist presence");
        }
    }

    async fn emit(&self, user_id: UserId, online: bool, at: DateTime<Utc>) {
        let recipients = match self.online_friends(user_id).await {
            Ok(friends) => friends,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to resolve friends for presence change");
                Vec::new()
            }
        };

        self.listener
            .presence_changed(PresenceChange {
                user_id,
                online,
                at,
                recipients,
            })
            .await;
    }
}
