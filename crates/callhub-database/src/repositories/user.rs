//! PostgreSQL-backed user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use callhub_core::error::{AppError, ErrorKind};
use callhub_core::result::AppResult;
use callhub_core::traits::UserDirectory;
use callhub_core::types::{DirectoryUser, UserId};

#[derive(Debug, FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    is_active: bool,
    is_online: bool,
    last_seen: Option<DateTime<Utc>>,
}

impl From<UserRow> for DirectoryUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            is_active: row.is_active,
            is_online: row.is_online,
            last_seen: row.last_seen,
        }
    }
}

/// Directory queries over the `users`, `friendships`, and `user_blocks` tables.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new directory over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<DirectoryUser>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, is_active, is_online, last_seen FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(DirectoryUser::from))
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM friendships
                WHERE status = 'accepted'
                  AND ((user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1))
            )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check friendship", e))
    }

    async fn is_blocked(&self, a: UserId, b: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM user_blocks
                WHERE (blocker_id = $1 AND blocked_id = $2) OR (blocker_id = $2 AND blocked_id = $1)
            )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check blocks", e))
    }

    async fn friend_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT CASE WHEN user_id = $1 THEN friend_id ELSE user_id END
             FROM friendships
             WHERE status = 'accepted' AND (user_id = $1 OR friend_id = $1)",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list friends", e))
    }

    async fn set_online(
        &self,
        user_id: UserId,
        online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_online = $2, last_seen = $3 WHERE id = $1")
            .bind(user_id)
            .bind(online)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update online flag", e)
            })?;
        Ok(())
    }
}
