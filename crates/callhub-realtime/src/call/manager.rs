//! Live call manager: the call state machine wired to rooms, delivery,
//! the directory, and the call store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use callhub_core::config::CallConfig;
use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::traits::{CallStore, UserDirectory};
use callhub_core::types::{CallId, CallRecord, CallStatus, CallType, RoomId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::payload::{CallAnswer, EndReason};
use crate::metrics::{RealtimeMetrics, calls};
use crate::room::manager::{LeaveOutcome, RoomManager};
use crate::room::room::{Participant, Room};

use super::transition;

/// A ringing or ongoing call.
#[derive(Debug)]
struct LiveCall {
    record: CallRecord,
    /// Held across a transition and its store, room and delivery effects.
    gate: Arc<Mutex<()>>,
}

/// Drives calls through their lifecycle.
///
/// Live (ringing or ongoing) calls are held in memory and are
/// authoritative; every transition is mirrored to the [`CallStore`].
/// Calls leave the live map as soon as they reach a terminal state, after
/// which queries are served from the store.
///
/// Mutations of one call are serialised by its gate, so the store and the
/// room always see that call's transitions in order. Leave cascades run
/// after the gate is released.
#[derive(Debug)]
pub struct CallManager {
    /// Call ID → live call
    calls: RwLock<HashMap<CallId, LiveCall>>,
    /// Durable history
    store: Arc<dyn CallStore>,
    /// Users and relationships
    directory: Arc<dyn UserDirectory>,
    /// Rooms carrying call signaling
    rooms: Arc<RoomManager>,
    /// Delivery primitive
    registry: Arc<ConnectionRegistry>,
    /// Metrics
    metrics: Arc<RealtimeMetrics>,
    /// Configuration
    config: CallConfig,
}

impl CallManager {
    /// Creates a new call manager.
    pub fn new(
        config: CallConfig,
        store: Arc<dyn CallStore>,
        directory: Arc<dyn UserDirectory>,
        rooms: Arc<RoomManager>,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            store,
            directory,
            rooms,
            registry,
            metrics,
            config,
        }
    }

    /// Places a call from `caller` to `callee_id`.
    ///
    /// Both users must exist, be active, be mutual friends, not block each
    /// other, and not already be in a ringing or ongoing call. On success
    /// the call is recorded as ringing, the caller joins the call's room,
    /// the callee is rung, and the ring timeout is armed.
    pub async fn request_call(
        self: &Arc<Self>,
        caller: Participant,
        callee_id: UserId,
        call_type: CallType,
    ) -> AppResult<CallRecord> {
        let caller_id = caller.user_id;
        if caller_id == callee_id {
            return Err(AppError::validation("Cannot call yourself"));
        }

        self.ensure_active_user(caller_id).await?;
        self.ensure_active_user(callee_id).await?;

        if !self.directory.are_friends(caller_id, callee_id).await? {
            return Err(AppError::precondition("Users are not friends"));
        }
        if self.directory.is_blocked(caller_id, callee_id).await? {
            return Err(AppError::precondition(
                "Calls between these users are blocked",
            ));
        }

        let gate = Arc::new(Mutex::new(()));
        let turn = gate.clone().lock_owned().await;
        let call = {
            let mut live = self.calls.write().await;
            let busy = live.values().map(|entry| &entry.record).find(|call| {
                call.status.is_active()
                    && (call.is_authorized(caller_id) || call.is_authorized(callee_id))
            });
            if let Some(busy) = busy {
                let who = if busy.is_authorized(caller_id) {
                    caller_id
                } else {
                    callee_id
                };
                return Err(AppError::conflict(format!("User {who} is already in a call")));
            }

            let call = CallRecord::ringing(caller_id, callee_id, call_type);
            live.insert(
                call.id,
                LiveCall {
                    record: call.clone(),
                    gate,
                },
            );
            call
        };
        calls::record_created(&self.metrics);

        if let Err(e) = self.store.insert(&call).await {
            warn!(call_id = %call.id, error = %e, "Failed to persist new call");
        }

        let left = match self
            .rooms
            .join_room(caller, call.room_id, call.call_type, Some(call.id))
            .await
        {
            Ok(outcome) => outcome.left,
            Err(e) => {
                warn!(call_id = %call.id, error = %e, "Caller could not join call room");
                None
            }
        };

        let rung = self
            .registry
            .send_to_user(&callee_id, builder::build_incoming_call(&call, callee_id));

        info!(
            call_id = %call.id,
            caller_id = %caller_id,
            callee_id = %callee_id,
            call_type = %call.call_type,
            callee_reachable = rung,
            "Call ringing"
        );

        drop(turn);
        if let Some(left) = &left {
            self.after_leave(left).await;
        }

        self.arm_ring_timeout(call.id);
        Ok(call)
    }

    /// Waits for exclusive use of a live call. `None` if it is not live.
    async fn lock_call(&self, call_id: CallId) -> Option<OwnedMutexGuard<()>> {
        let gate = self.calls.read().await.get(&call_id)?.gate.clone();
        Some(gate.lock_owned().await)
    }

    fn arm_ring_timeout(self: &Arc<Self>, call_id: CallId) {
        let manager = Arc::downgrade(self);
        let timeout = self.config.ring_timeout();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(manager) = manager.upgrade() {
                manager.expire(call_id).await;
            }
        });
    }

    /// The callee picks up a ringing call.
    pub async fn accept(&self, callee: Participant, call_id: CallId) -> AppResult<CallRecord> {
        let Some(turn) = self.lock_call(call_id).await else {
            return Err(self.not_live(call_id, callee.user_id).await);
        };
        let accepted = {
            let mut live = self.calls.write().await;
            match live.get_mut(&call_id) {
                Some(entry) => {
                    transition::ensure_callee(&entry.record, callee.user_id)?;
                    transition::accept(&mut entry.record, callee.user_id, Utc::now())?;
                    Some(entry.record.clone())
                }
                None => None,
            }
        };
        let Some(call) = accepted else {
            return Err(self.not_live(call_id, callee.user_id).await);
        };

        self.persist(&call).await;

        let left = match self
            .rooms
            .join_room(callee, call.room_id, call.call_type, Some(call.id))
            .await
        {
            Ok(outcome) => outcome.left,
            Err(e) => {
                warn!(call_id = %call.id, error = %e, "Callee could not join call room");
                None
            }
        };

        self.registry.send_to_user(
            &call.caller_id,
            builder::build_call_response(&call, callee.user_id, CallAnswer::Accept),
        );
        drop(turn);

        if let Some(left) = &left {
            self.after_leave(left).await;
        }

        info!(call_id = %call.id, callee_id = %callee.user_id, "Call accepted");
        Ok(call)
    }

    /// The callee rejects a ringing call.
    pub async fn decline(&self, callee: UserId, call_id: CallId) -> AppResult<CallRecord> {
        let _turn = self.lock_call(call_id).await;
        let declined = {
            let mut live = self.calls.write().await;
            match live.get_mut(&call_id) {
                Some(entry) => {
                    transition::ensure_callee(&entry.record, callee)?;
                    transition::decline(&mut entry.record, Utc::now())?;
                    live.remove(&call_id).map(|entry| entry.record)
                }
                None => None,
            }
        };
        let Some(call) = declined else {
            return Err(self.not_live(call_id, callee).await);
        };

        self.registry.send_to_user(
            &call.caller_id,
            builder::build_call_response(&call, callee, CallAnswer::Decline),
        );
        self.retire(&call).await;

        info!(call_id = %call.id, callee_id = %callee, "Call declined");
        Ok(call)
    }

    /// Ends a call on behalf of any authorised participant.
    ///
    /// Ending a call that is already terminal is a no-op returning the
    /// stored record.
    pub async fn end(&self, user_id: UserId, call_id: CallId) -> AppResult<CallRecord> {
        let _turn = self.lock_call(call_id).await;
        let ended = {
            let mut live = self.calls.write().await;
            match live.get_mut(&call_id) {
                Some(entry) => {
                    transition::ensure_authorized(&entry.record, user_id)?;
                    transition::end(&mut entry.record, Utc::now());
                    live.remove(&call_id).map(|entry| entry.record)
                }
                None => None,
            }
        };

        let call = match ended {
            Some(call) => call,
            None => return self.end_stored(user_id, call_id).await,
        };

        let notice = builder::build_call_end(&call, Some(user_id), EndReason::Ended);
        for other in call.counterparts(user_id) {
            self.registry.send_to_user(&other, notice.clone());
        }
        self.retire(&call).await;

        info!(
            call_id = %call.id,
            ended_by = %user_id,
            duration_seconds = ?call.duration_seconds,
            "Call ended"
        );
        Ok(call)
    }

    /// End for a call that is not live: idempotent for terminal records,
    /// closes out records left non-terminal in the store.
    async fn end_stored(&self, user_id: UserId, call_id: CallId) -> AppResult<CallRecord> {
        let mut call = self
            .store
            .find(call_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Call {call_id} not found")))?;
        transition::ensure_authorized(&call, user_id)?;

        if transition::end(&mut call, Utc::now()) {
            debug!(call_id = %call_id, "Closing out stored call that was not live");
            self.persist(&call).await;
        }
        Ok(call)
    }

    /// Marks a still-ringing call as missed. Called by the ring timer.
    pub async fn expire(&self, call_id: CallId) -> bool {
        let Some(_turn) = self.lock_call(call_id).await else {
            return false;
        };
        let missed = {
            let mut live = self.calls.write().await;
            match live.get_mut(&call_id) {
                Some(entry) => {
                    if transition::miss(&mut entry.record, Utc::now()) {
                        live.remove(&call_id).map(|entry| entry.record)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        let Some(call) = missed else {
            return false;
        };

        let notice = builder::build_call_end(&call, None, EndReason::Missed);
        self.registry.send_to_user(&call.caller_id, notice.clone());
        if let Some(callee) = call.callee_id {
            self.registry.send_to_user(&callee, notice);
        }
        self.retire(&call).await;

        info!(call_id = %call.id, "Call missed");
        true
    }

    /// Joins a connection to a room at the client's request.
    ///
    /// Rooms that carry a live call only admit that call's participants,
    /// and a new member is appended to the call's participant list.
    pub async fn join_room(
        &self,
        participant: Participant,
        room_id: RoomId,
        room_type: CallType,
    ) -> AppResult<Room> {
        let call_id = self.rooms.call_of(&room_id).await;

        let turn = match call_id {
            Some(call_id) => {
                let Some(turn) = self.lock_call(call_id).await else {
                    return Err(self.not_live(call_id, participant.user_id).await);
                };
                let live = self
                    .calls
                    .read()
                    .await
                    .get(&call_id)
                    .map(|entry| entry.record.clone());
                match live {
                    Some(call) => transition::ensure_authorized(&call, participant.user_id)?,
                    None => return Err(self.not_live(call_id, participant.user_id).await),
                }
                Some(turn)
            }
            None => None,
        };

        let outcome = self
            .rooms
            .join_room(participant, room_id, room_type, call_id)
            .await?;

        if let Some(call_id) = call_id {
            let updated = {
                let mut live = self.calls.write().await;
                live.get_mut(&call_id).and_then(|entry| {
                    transition::add_participant(&mut entry.record, participant.user_id)
                        .then(|| entry.record.clone())
                })
            };
            if let Some(call) = updated {
                self.persist(&call).await;
            }
        }
        drop(turn);

        if let Some(left) = &outcome.left {
            self.after_leave(left).await;
        }

        Ok(outcome.room)
    }

    /// Removes a connection from its room without ending the call.
    ///
    /// When the room empties, the call it carries is ended automatically.
    pub async fn leave(&self, participant: Participant) -> Option<LeaveOutcome> {
        let outcome = self.rooms.leave_room(&participant.connection_id).await?;
        self.after_leave(&outcome).await;
        Some(outcome)
    }

    async fn after_leave(&self, outcome: &LeaveOutcome) {
        let Some(call_id) = outcome.call_id else {
            return;
        };
        if !outcome.room_deleted {
            return;
        }

        debug!(call_id = %call_id, "Last participant left, ending call");
        if let Err(e) = self.end(outcome.participant.user_id, call_id).await {
            warn!(call_id = %call_id, error = %e, "Failed to end call after last participant left");
        }
    }

    /// Looks up a call visible to `user_id`.
    pub async fn get_call(&self, user_id: UserId, call_id: CallId) -> AppResult<CallRecord> {
        let live = self
            .calls
            .read()
            .await
            .get(&call_id)
            .map(|entry| entry.record.clone());
        let call = match live {
            Some(call) => call,
            None => self
                .store
                .find(call_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Call {call_id} not found")))?,
        };
        transition::ensure_authorized(&call, user_id)?;
        Ok(call)
    }

    /// The ringing or ongoing call involving `user_id`, if any.
    pub async fn active_call_for(&self, user_id: UserId) -> Option<CallRecord> {
        self.calls
            .read()
            .await
            .values()
            .map(|entry| &entry.record)
            .find(|call| call.status.is_active() && call.is_authorized(user_id))
            .cloned()
    }

    /// Call history of a user, newest first.
    pub async fn history(&self, user_id: UserId, limit: Option<u32>) -> AppResult<Vec<CallRecord>> {
        let max = self.config.history_limit.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);
        self.store.history_for_user(user_id, limit).await
    }

    /// Number of live calls.
    pub async fn live_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn ensure_active_user(&self, user_id: UserId) -> AppResult<()> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        if !user.is_active {
            return Err(AppError::precondition(format!("User {user_id} is not active")));
        }
        Ok(())
    }

    /// Error for an operation on a call that is not live.
    async fn not_live(&self, call_id: CallId, user_id: UserId) -> AppError {
        match self.store.find(call_id).await {
            Ok(Some(call)) => match transition::ensure_authorized(&call, user_id) {
                Ok(()) => AppError::conflict(format!("Call {call_id} is already {}", call.status)),
                Err(e) => e,
            },
            Ok(None) => AppError::not_found(format!("Call {call_id} not found")),
            Err(e) => e,
        }
    }

    async fn persist(&self, call: &CallRecord) {
        if let Err(e) = self.store.update(call).await {
            warn!(call_id = %call.id, status = %call.status, error = %e, "Failed to persist call");
        }
    }

    /// Persist a terminal call and tear its room down.
    async fn retire(&self, call: &CallRecord) {
        self.persist(call).await;
        calls::record_completed(&self.metrics, call.status == CallStatus::Missed);
        self.rooms.close_room(&call.room_id).await;
    }
}
