//! Pure state transitions applied to a [`CallRecord`].

use chrono::{DateTime, Utc};

use callhub_core::error::AppError;
use callhub_core::result::AppResult;
use callhub_core::types::{CallRecord, CallStatus, UserId};

/// Fail unless `user_id` may see or act on the call.
pub fn ensure_authorized(call: &CallRecord, user_id: UserId) -> AppResult<()> {
    if call.is_authorized(user_id) {
        Ok(())
    } else {
        Err(AppError::authorization(format!(
            "User {user_id} is not a participant of call {}",
            call.id
        )))
    }
}

/// Fail unless `user_id` is the designated callee.
pub fn ensure_callee(call: &CallRecord, user_id: UserId) -> AppResult<()> {
    ensure_authorized(call, user_id)?;
    if call.callee_id == Some(user_id) {
        Ok(())
    } else {
        Err(AppError::authorization("Only the callee can answer a call"))
    }
}

fn ensure_transition(call: &CallRecord, next: CallStatus) -> AppResult<()> {
    if call.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::conflict(format!(
            "Call {} is {} and cannot become {next}",
            call.id, call.status
        )))
    }
}

fn finish(call: &mut CallRecord, status: CallStatus, at: DateTime<Utc>) {
    call.status = status;
    call.ended_at = Some(at);
    call.duration_seconds = call
        .started_at
        .map(|started| (at - started).num_seconds().max(0));
}

/// `ringing → ongoing`. The callee becomes a participant.
pub fn accept(call: &mut CallRecord, callee: UserId, at: DateTime<Utc>) -> AppResult<()> {
    ensure_transition(call, CallStatus::Ongoing)?;
    call.status = CallStatus::Ongoing;
    call.started_at = Some(at);
    add_participant(call, callee);
    Ok(())
}

/// `ringing → declined`.
pub fn decline(call: &mut CallRecord, at: DateTime<Utc>) -> AppResult<()> {
    ensure_transition(call, CallStatus::Declined)?;
    finish(call, CallStatus::Declined, at);
    Ok(())
}

/// Any non-terminal state `→ ended`.
///
/// Returns `false` (and changes nothing) when the call is already
/// terminal.
pub fn end(call: &mut CallRecord, at: DateTime<Utc>) -> bool {
    if call.status.is_terminal() {
        return false;
    }
    finish(call, CallStatus::Ended, at);
    true
}

/// `ringing → missed`. Returns `false` when the call is no longer ringing.
pub fn miss(call: &mut CallRecord, at: DateTime<Utc>) -> bool {
    if call.status != CallStatus::Ringing {
        return false;
    }
    finish(call, CallStatus::Missed, at);
    true
}

/// Append a participant unless already listed.
pub fn add_participant(call: &mut CallRecord, user_id: UserId) -> bool {
    if call.participants.contains(&user_id) {
        return false;
    }
    call.participants.push(user_id);
    true
}
