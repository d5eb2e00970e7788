//! In-memory user directory using a Tokio `RwLock`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::traits::UserDirectory;
use callhub_core::types::{DirectoryUser, UserId};

#[derive(Debug, Default)]
struct InnerState {
    users: HashMap<UserId, DirectoryUser>,
    /// Friend pairs stored with the smaller id first.
    friendships: HashSet<(UserId, UserId)>,
    /// `(blocker, blocked)` pairs.
    blocks: HashSet<(UserId, UserId)>,
}

fn pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a.0 <= b.0 { (a, b) } else { (b, a) }
}

/// Directory held entirely in process memory.
///
/// Suitable for single-node development and tests only.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    state: Arc<RwLock<InnerState>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active user and returns its id.
    pub async fn add_user(&self, username: &str) -> UserId {
        let id = UserId::new();
        self.insert_user(DirectoryUser {
            id,
            username: username.to_string(),
            is_active: true,
            is_online: false,
            last_seen: None,
        })
        .await;
        id
    }

    /// Inserts or replaces a user record.
    pub async fn insert_user(&self, user: DirectoryUser) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Marks a user as inactive (disabled account).
    pub async fn deactivate(&self, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        user.is_active = false;
        Ok(())
    }

    /// Records a mutual friendship.
    pub async fn add_friendship(&self, a: UserId, b: UserId) {
        self.state.write().await.friendships.insert(pair(a, b));
    }

    /// Records that `blocker` has blocked `blocked`.
    pub async fn block(&self, blocker: UserId, blocked: UserId) {
        self.state.write().await.blocks.insert((blocker, blocked));
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<DirectoryUser>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> AppResult<bool> {
        Ok(self.state.read().await.friendships.contains(&pair(a, b)))
    }

    async fn is_blocked(&self, a: UserId, b: UserId) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.blocks.contains(&(a, b)) || state.blocks.contains(&(b, a)))
    }

    async fn friend_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .filter_map(|&(a, b)| {
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn set_online(
        &self,
        user_id: UserId,
        online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.is_online = online;
            user.last_seen = Some(last_seen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_friendship_is_symmetric() {
        let directory = MemoryUserDirectory::new();
        let alice = directory.add_user("alice").await;
        let bob = directory.add_user("bob").await;
        let carol = directory.add_user("carol").await;
        directory.add_friendship(bob, alice).await;

        assert!(directory.are_friends(alice, bob).await.unwrap());
        assert!(directory.are_friends(bob, alice).await.unwrap());
        assert!(!directory.are_friends(alice, carol).await.unwrap());
        assert_eq!(directory.friend_ids(alice).await.unwrap(), vec![bob]);
    }

    #[tokio::test]
    async fn test_block_applies_both_ways() {
        let directory = MemoryUserDirectory::new();
        let alice = directory.add_user("alice").await;
        let bob = directory.add_user("bob").await;
        directory.block(bob, alice).await;

        assert!(directory.is_blocked(alice, bob).await.unwrap());
        assert!(directory.is_blocked(bob, alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_online_updates_record() {
        let directory = MemoryUserDirectory::new();
        let alice = directory.add_user("alice").await;
        let now = Utc::now();
        directory.set_online(alice, true, now).await.unwrap();

        let user = directory.find_user(alice).await.unwrap().expect("user");
        assert!(user.is_online);
        assert_eq!(user.last_seen, Some(now));
    }

    #[tokio::test]
    async fn test_deactivate_unknown_user_fails() {
        let directory = MemoryUserDirectory::new();
        assert!(directory.deactivate(UserId::new()).await.is_err());
    }
}
