//! In-memory call store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::traits::CallStore;
use callhub_core::types::{CallId, CallRecord, UserId};

/// Call history held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCallStore {
    calls: Arc<RwLock<HashMap<CallId, CallRecord>>>,
}

impl MemoryCallStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored calls.
    pub async fn len(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Whether the store holds no calls.
    pub async fn is_empty(&self) -> bool {
        self.calls.read().await.is_empty()
    }
}

#[async_trait]
impl CallStore for MemoryCallStore {
    async fn insert(&self, call: &CallRecord) -> AppResult<()> {
        let mut calls = self.calls.write().await;
        if calls.contains_key(&call.id) {
            return Err(AppError::conflict(format!("Call {} already exists", call.id)));
        }
        calls.insert(call.id, call.clone());
        Ok(())
    }

    async fn update(&self, call: &CallRecord) -> AppResult<()> {
        let mut calls = self.calls.write().await;
        match calls.get_mut(&call.id) {
            Some(existing) => {
                *existing = call.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("Call {} not found", call.id))),
        }
    }

    async fn find(&self, call_id: CallId) -> AppResult<Option<CallRecord>> {
        Ok(self.calls.read().await.get(&call_id).cloned())
    }

    async fn history_for_user(&self, user_id: UserId, limit: u32) -> AppResult<Vec<CallRecord>> {
        let calls = self.calls.read().await;
        let mut history: Vec<CallRecord> = calls
            .values()
            .filter(|call| call.is_authorized(user_id))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history.truncate(limit as usize);
        Ok(history)
    }
}
