//! PostgreSQL-backed call store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use callhub_core::error::{AppError, ErrorKind};
use callhub_core::result::AppResult;
use callhub_core::traits::CallStore;
use callhub_core::types::{CallId, CallRecord, RoomId, UserId};

const CALL_COLUMNS: &str = "id, caller_id, callee_id, call_type, status, room_id, participants, \
                            created_at, started_at, ended_at, duration_seconds";

#[derive(Debug, FromRow)]
struct CallRow {
    id: CallId,
    caller_id: UserId,
    callee_id: Option<UserId>,
    call_type: String,
    status: String,
    room_id: RoomId,
    participants: Vec<Uuid>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
}

impl TryFrom<CallRow> for CallRecord {
    type Error = AppError;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            caller_id: row.caller_id,
            callee_id: row.callee_id,
            call_type: row.call_type.parse()?,
            status: row.status.parse()?,
            room_id: row.room_id,
            participants: row.participants.into_iter().map(UserId::from).collect(),
            created_at: row.created_at,
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_seconds: row.duration_seconds,
        })
    }
}

fn participant_uuids(call: &CallRecord) -> Vec<Uuid> {
    call.participants.iter().map(|id| id.into_uuid()).collect()
}

/// Call history over the `calls` table.
#[derive(Debug, Clone)]
pub struct PgCallStore {
    pool: PgPool,
}

impl PgCallStore {
    /// Create a new store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallStore for PgCallStore {
    async fn insert(&self, call: &CallRecord) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO calls ({CALL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(call.id)
        .bind(call.caller_id)
        .bind(call.callee_id)
        .bind(call.call_type.as_str())
        .bind(call.status.as_str())
        .bind(call.room_id)
        .bind(participant_uuids(call))
        .bind(call.created_at)
        .bind(call.started_at)
        .bind(call.ended_at)
        .bind(call.duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert call", e))?;
        Ok(())
    }

    async fn update(&self, call: &CallRecord) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE calls
             SET callee_id = $2, status = $3, participants = $4,
                 started_at = $5, ended_at = $6, duration_seconds = $7
             WHERE id = $1",
        )
        .bind(call.id)
        .bind(call.callee_id)
        .bind(call.status.as_str())
        .bind(participant_uuids(call))
        .bind(call.started_at)
        .bind(call.ended_at)
        .bind(call.duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update call", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Call {} not found", call.id)));
        }
        Ok(())
    }

    async fn find(&self, call_id: CallId) -> AppResult<Option<CallRecord>> {
        let row = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"
        ))
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find call", e))?;

        row.map(CallRecord::try_from).transpose()
    }

    async fn history_for_user(&self, user_id: UserId, limit: u32) -> AppResult<Vec<CallRecord>> {
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
             WHERE caller_id = $1 OR callee_id = $1 OR $1 = ANY(participants)
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load call history", e))?;

        rows.into_iter().map(CallRecord::try_from).collect()
    }
}
