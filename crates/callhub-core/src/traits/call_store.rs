//! Durable call history store.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::call::CallRecord;
use crate::types::id::{CallId, UserId};

/// Durable storage of call records.
///
/// The live state machine is authoritative while a call is active; the
/// store mirrors every transition and serves history once calls end.
#[async_trait]
pub trait CallStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a newly created call.
    async fn insert(&self, call: &CallRecord) -> AppResult<()>;

    /// Overwrite the mutable fields of an existing call.
    async fn update(&self, call: &CallRecord) -> AppResult<()>;

    /// Find a call by id.
    async fn find(&self, call_id: CallId) -> AppResult<Option<CallRecord>>;

    /// Calls the user took part in, newest first.
    async fn history_for_user(&self, user_id: UserId, limit: u32) -> AppResult<Vec<CallRecord>>;
}
