//! Observer contract for presence transitions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use callhub_core::types::UserId;

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;

/// A user went online or offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    /// Subject of the change.
    pub user_id: UserId,
    /// New state.
    pub online: bool,
    /// When it happened.
    pub at: DateTime<Utc>,
    /// Friends of the subject that are online right now.
    pub recipients: Vec<UserId>,
}

/// Receives every presence transition produced by the tracker.
#[async_trait]
pub trait PresenceListener: Send + Sync + std::fmt::Debug + 'static {
    /// Called once per transition, with no tracker lock held.
    async fn presence_changed(&self, change: PresenceChange);
}

/// Delivers `presence` signals to the subject's online friends.
#[derive(Debug)]
pub struct FriendPresenceNotifier {
    /// Delivery primitive.
    registry: Arc<ConnectionRegistry>,
}

impl FriendPresenceNotifier {
    /// Creates a notifier delivering through `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PresenceListener for FriendPresenceNotifier {
    async fn presence_changed(&self, change: PresenceChange) {
        let msg = builder::build_presence(change.user_id, change.online, change.at);
        for friend in &change.recipients {
            self.registry.send_to_user(friend, msg.clone());
        }
    }
}
