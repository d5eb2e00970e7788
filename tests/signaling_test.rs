//! Integration tests for call signaling over live connections.

mod helpers;

use std::convert::Infallible;
use std::time::Duration;

use serde_json::json;

use callhub_core::config::AppConfig;
use callhub_core::traits::CallStore;
use callhub_core::types::{CallId, CallRecord, CallStatus, RoomId};
use callhub_realtime::message::{Frame, SignalKind, SignalMessage};
use callhub_realtime::room::RoomStatus;

use helpers::{TestHub, eventually};

fn call_id_of(msg: &SignalMessage) -> CallId {
    serde_json::from_value(msg.payload["call_id"].clone()).expect("call_id in payload")
}

async fn wait_for_room_gone(hub: &TestHub, room_id: RoomId) {
    for _ in 0..250 {
        if hub.engine.rooms.room(&room_id).await.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("room {room_id} still exists");
}

async fn wait_for_status(hub: &TestHub, call_id: CallId, status: CallStatus) -> CallRecord {
    for _ in 0..250 {
        if let Some(call) = hub.store.find(call_id).await.expect("store") {
            if call.status == status {
                return call;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("call {call_id} never reached {status}");
}

#[tokio::test]
async fn test_full_call_between_friends() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let bob = hub.user("bob").await;
    hub.befriend(&alice, &bob).await;

    let mut a = hub.connect(&alice).await;
    let mut b = hub.connect(&bob).await;

    a.send(json!({
        "kind": "call_request",
        "to": bob.user_id,
        "payload": { "call_type": "audio" },
    }));

    let echo = a.expect(SignalKind::CallRequest).await;
    let call_id = call_id_of(&echo);

    let ring = b.expect(SignalKind::CallRequest).await;
    assert_eq!(ring.from, Some(alice.user_id));
    assert_eq!(call_id_of(&ring), call_id);
    assert_eq!(ring.payload["call_type"], "audio");
    let room_id = ring.room_id.expect("ring carries the room");

    b.send(json!({
        "kind": "call_response",
        "payload": { "call_id": call_id, "response": "accept" },
    }));

    let joined = a.expect(SignalKind::UserJoined).await;
    assert_eq!(joined.from, Some(bob.user_id));
    let answer = a.expect(SignalKind::CallResponse).await;
    assert_eq!(answer.from, Some(bob.user_id));
    assert_eq!(answer.payload["response"], "accept");

    let room = hub.engine.rooms.room(&room_id).await.expect("room exists");
    assert_eq!(room.status, RoomStatus::Active);
    assert_eq!(room.participant_ids(), vec![alice.user_id, bob.user_id]);

    // Directed relay
    a.send(json!({
        "kind": "offer",
        "to": bob.user_id,
        "payload": { "sdp": "v=0" },
    }));
    let offer = b.expect(SignalKind::Offer).await;
    assert_eq!(offer.from, Some(alice.user_id));
    assert_eq!(offer.payload["sdp"], "v=0");

    // Room relay
    b.send(json!({
        "kind": "ice_candidate",
        "room_id": room_id,
        "payload": { "candidate": "candidate:1" },
    }));
    let candidate = a.expect(SignalKind::IceCandidate).await;
    assert_eq!(candidate.from, Some(bob.user_id));

    a.send(json!({ "kind": "call_end", "payload": { "call_id": call_id } }));
    let end = b.expect(SignalKind::CallEnd).await;
    assert_eq!(end.from, Some(alice.user_id));
    assert_eq!(end.payload["reason"], "ended");
    assert!(end.payload["duration_seconds"].is_i64());

    wait_for_room_gone(&hub, room_id).await;

    let stored = wait_for_status(&hub, call_id, CallStatus::Ended).await;
    assert!(stored.started_at.is_some());
    assert!(stored.ended_at.is_some());
    assert!(stored.duration_seconds.is_some());
    assert_eq!(hub.engine.calls.live_count().await, 0);

    // Ending again is a no-op
    a.send(json!({ "kind": "call_end", "payload": { "call_id": call_id } }));
    a.send(json!({ "kind": "heartbeat" }));
    a.expect(SignalKind::HeartbeatAck).await;
    assert!(
        a.recv_within(Duration::from_millis(100))
            .await
            .is_none_or(|m| m.kind != SignalKind::Error)
    );
}

#[tokio::test]
async fn test_call_to_non_friend_is_rejected() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let carol = hub.user("carol").await;

    let mut a = hub.connect(&alice).await;
    let mut c = hub.connect(&carol).await;

    a.send(json!({ "kind": "call_request", "to": carol.user_id }));

    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "PRECONDITION");
    assert!(hub.store.is_empty().await);
    assert!(hub.engine.calls.active_call_for(alice.user_id).await.is_none());
    assert!(c.recv_within(Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_decline_notifies_caller_and_tears_down_room() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let bob = hub.user("bob").await;
    hub.befriend(&alice, &bob).await;

    let mut a = hub.connect(&alice).await;
    let mut b = hub.connect(&bob).await;

    a.send(json!({ "kind": "call_request", "to": bob.user_id }));
    let ring = b.expect(SignalKind::CallRequest).await;
    let call_id = call_id_of(&ring);
    let room_id = ring.room_id.expect("room");

    b.send(json!({
        "kind": "call_response",
        "payload": { "call_id": call_id, "response": "decline" },
    }));

    let answer = a.expect(SignalKind::CallResponse).await;
    assert_eq!(answer.payload["response"], "decline");
    wait_for_room_gone(&hub, room_id).await;

    let stored = wait_for_status(&hub, call_id, CallStatus::Declined).await;
    assert!(stored.started_at.is_none());
    assert!(stored.ended_at.is_some());

    // Accepting a declined call is a conflict
    b.send(json!({
        "kind": "call_response",
        "payload": { "call_id": call_id, "response": "accept" },
    }));
    let err = b.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "CONFLICT");
}

#[tokio::test]
async fn test_last_leave_ends_the_call() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let bob = hub.user("bob").await;
    hub.befriend(&alice, &bob).await;

    let mut a = hub.connect(&alice).await;
    let mut b = hub.connect(&bob).await;

    a.send(json!({ "kind": "call_request", "to": bob.user_id }));
    let ring = b.expect(SignalKind::CallRequest).await;
    let call_id = call_id_of(&ring);
    let room_id = ring.room_id.expect("room");
    b.send(json!({
        "kind": "call_response",
        "payload": { "call_id": call_id, "response": "accept" },
    }));
    a.expect(SignalKind::CallResponse).await;

    b.send(json!({ "kind": "leave_room" }));
    let left = a.expect(SignalKind::UserLeft).await;
    assert_eq!(left.from, Some(bob.user_id));
    assert_eq!(left.room_id, Some(room_id));

    // Leaving does not end the call while someone remains
    let live = hub.engine.calls.active_call_for(alice.user_id).await;
    assert_eq!(live.map(|c| c.status), Some(CallStatus::Ongoing));

    a.send(json!({ "kind": "leave_room" }));
    wait_for_room_gone(&hub, room_id).await;

    wait_for_status(&hub, call_id, CallStatus::Ended).await;
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let mut a = hub.connect(&alice).await;

    a.send_raw("not json at all");
    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "INVALID_MESSAGE");

    a.send(json!({ "kind": "teleport" }));
    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "UNKNOWN_KIND");

    a.send(json!({ "kind": "user_joined" }));
    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "INVALID_MESSAGE");

    a.send(json!({ "kind": "heartbeat" }));
    a.expect(SignalKind::HeartbeatAck).await;
    assert!(hub.engine.registry.is_connected(&alice.user_id));
    assert!(hub.engine.metrics.snapshot().protocol_errors >= 2);
}

#[tokio::test]
async fn test_relay_to_room_requires_membership() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let mut a = hub.connect(&alice).await;

    a.send(json!({
        "kind": "offer",
        "room_id": RoomId::new(),
        "payload": { "sdp": "v=0" },
    }));
    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "AUTHORIZATION");
}

#[tokio::test]
async fn test_directed_relay_requires_shared_call() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let bob = hub.user("bob").await;
    let mallory = hub.user("mallory").await;
    hub.befriend(&alice, &bob).await;

    let mut a = hub.connect(&alice).await;
    let mut b = hub.connect(&bob).await;
    let mut m = hub.connect(&mallory).await;

    m.send(json!({
        "kind": "offer",
        "to": bob.user_id,
        "payload": { "sdp": "v=0" },
    }));
    let err = m.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "AUTHORIZATION");

    a.send(json!({ "kind": "call_request", "to": bob.user_id }));
    a.expect(SignalKind::CallRequest).await;
    b.expect(SignalKind::CallRequest).await;

    // Ringing is enough to start negotiating.
    a.send(json!({
        "kind": "ice_candidate",
        "to": bob.user_id,
        "payload": { "candidate": "candidate:1" },
    }));
    let candidate = b.expect(SignalKind::IceCandidate).await;
    assert_eq!(candidate.from, Some(alice.user_id));

    b.disconnect().await;
    let registry = hub.engine.registry.clone();
    eventually(|| !registry.is_connected(&bob.user_id)).await;

    a.send(json!({ "kind": "answer", "to": bob.user_id }));
    let err = a.expect(SignalKind::Error).await;
    assert_eq!(err.payload["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_replaced_connection_keeps_user_online() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;

    let mut first = hub.connect(&alice).await;
    let mut second = hub.connect(&alice).await;

    assert!(first.closed().await);
    assert_eq!(hub.engine.registry.connection_count(), 1);
    assert_eq!(hub.engine.metrics.snapshot().connections_replaced, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(hub.engine.presence.is_online(alice.user_id));

    second.send(json!({ "kind": "heartbeat" }));
    second.expect(SignalKind::HeartbeatAck).await;
}

#[tokio::test]
async fn test_saturated_queue_disconnects_once() {
    let mut config = AppConfig::default();
    config.realtime.outbound_queue_size = 4;
    let hub = TestHub::with_config(config).await;
    let bob = hub.user("bob").await;

    // A peer that never reads: the transport accepts one frame, then stalls.
    let (stalled_tx, _stalled_rx) = futures::channel::mpsc::channel::<Frame>(0);
    let (_inbound_tx, inbound_rx) = futures::channel::mpsc::unbounded::<Result<Frame, Infallible>>();
    let engine = hub.engine.clone();
    let user = bob.clone();
    let task = tokio::spawn(async move {
        engine.run_connection(user, inbound_rx, stalled_tx).await;
    });

    let registry = hub.engine.registry.clone();
    eventually(|| registry.is_connected(&bob.user_id)).await;

    let mut failures = 0;
    for _ in 0..64 {
        if !registry.send_to_user(&bob.user_id, SignalMessage::new(SignalKind::Offer)) {
            failures += 1;
        }
    }

    assert!(failures > 0);
    assert!(!registry.is_connected(&bob.user_id));
    assert_eq!(hub.engine.metrics.snapshot().backpressure_disconnects, 1);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("connection task finished")
        .expect("connection task did not panic");
    eventually(|| !hub.engine.presence.is_online(bob.user_id)).await;
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_call_is_missed() {
    let hub = TestHub::new().await;
    let alice = hub.user("alice").await;
    let bob = hub.user("bob").await;
    hub.befriend(&alice, &bob).await;

    let mut a = hub.connect(&alice).await;
    let mut b = hub.connect(&bob).await;

    a.send(json!({ "kind": "call_request", "to": bob.user_id }));
    let ring = b.expect(SignalKind::CallRequest).await;
    let call_id = call_id_of(&ring);

    let wait = Duration::from_secs(120);
    let a_end = a.expect_within(SignalKind::CallEnd, wait).await;
    let b_end = b.expect_within(SignalKind::CallEnd, wait).await;
    assert_eq!(a_end.payload["reason"], "missed");
    assert_eq!(b_end.payload["reason"], "missed");
    assert!(a_end.from.is_none());

    let stored = wait_for_status(&hub, call_id, CallStatus::Missed).await;
    assert!(stored.started_at.is_none());
    assert_eq!(hub.engine.calls.live_count().await, 0);
    eventually(|| hub.engine.metrics.snapshot().calls_missed == 1).await;
}
