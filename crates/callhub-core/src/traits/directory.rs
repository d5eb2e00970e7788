//! User/friend directory consumed by the signaling core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::id::UserId;
use crate::types::user::DirectoryUser;

/// Read access to users and their relationships, plus the durable
/// online flag.
///
/// Two implementations are provided by `callhub-database`:
/// - PostgreSQL (`PgUserDirectory`)
/// - In-memory (`MemoryUserDirectory`)
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look up a user. Returns `None` if the user does not exist.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<DirectoryUser>>;

    /// Check whether two users are mutual friends.
    async fn are_friends(&self, a: UserId, b: UserId) -> AppResult<bool>;

    /// Check whether either user has blocked the other.
    async fn is_blocked(&self, a: UserId, b: UserId) -> AppResult<bool>;

    /// List the friends of a user.
    async fn friend_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>>;

    /// Persist the online flag and last-seen time for a user.
    async fn set_online(
        &self,
        user_id: UserId,
        online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()>;
}
