//! Per-connection read and write loops.
//!
//! Both loops are generic over a stream/sink of [`Frame`]s. Whichever loop
//! stops first unregisters the connection, which cancels the other one.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatcher::SignalDispatcher;
use crate::message::serializer::{DecodeError, encode_outbound};
use crate::message::types::{Frame, SignalMessage};

use super::handle::ConnectionHandle;
use super::registry::ConnectionRegistry;

/// Upper bound on delivering the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drain the outbound queue into the transport.
///
/// Sends a ping after `idle_timeout` without outbound traffic. Any write
/// failure tears the connection down.
pub async fn run_write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<SignalMessage>,
    handle: Arc<ConnectionHandle>,
    registry: Arc<ConnectionRegistry>,
    idle_timeout: Duration,
) where
    S: Sink<Frame> + Unpin,
    S::Error: Display,
{
    loop {
        let frame = tokio::select! {
            _ = handle.cancelled() => break,
            next = outbound.recv() => match next {
                Some(msg) => match encode_outbound(&msg) {
                    Ok(text) => Frame::Text(text),
                    Err(e) => {
                        warn!(conn_id = %handle.id, kind = %msg.kind, error = %e, "Failed to encode outbound message");
                        continue;
                    }
                },
                None => break,
            },
            _ = tokio::time::sleep(idle_timeout) => Frame::Ping(Vec::new()),
        };

        let sent = tokio::select! {
            _ = handle.cancelled() => break,
            sent = sink.send(frame) => sent,
        };
        if let Err(e) = sent {
            debug!(conn_id = %handle.id, error = %e, "Write failed");
            break;
        }
    }

    // A peer that stopped reading must not hold the task forever.
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Frame::Close)).await;
    registry.unregister(&handle.id);
    debug!(conn_id = %handle.id, "Write loop ended");
}

/// Read frames and dispatch them until the peer goes away.
///
/// The connection is declared dead when no frame at all arrives within
/// `read_deadline`. Malformed messages are answered with an `error` signal
/// and do not end the loop.
pub async fn run_read_loop<S, E>(
    mut stream: S,
    handle: Arc<ConnectionHandle>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<SignalDispatcher>,
    read_deadline: Duration,
) where
    S: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            _ = handle.cancelled() => break,
            next = tokio::time::timeout(read_deadline, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                warn!(conn_id = %handle.id, user_id = %handle.user_id, "Read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(conn_id = %handle.id, error = %e, "Read failed");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        handle.touch();
        match frame {
            Frame::Text(text) => dispatcher.handle_text(&handle, &text).await,
            Frame::Binary(_) => {
                dispatcher.reject(
                    &handle,
                    &DecodeError::Malformed("Binary frames are not supported".to_string()),
                );
            }
            Frame::Ping(_) | Frame::Pong(_) => {}
            Frame::Close => break,
        }
    }

    registry.unregister(&handle.id);
    debug!(conn_id = %handle.id, "Read loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    use callhub_core::config::AppConfig;
    use callhub_core::types::{AuthenticatedUser, UserId, UserRole};
    use callhub_database::{MemoryCallStore, MemoryUserDirectory};
    use futures::channel::mpsc as transport;

    use crate::message::builder;
    use crate::message::types::SignalKind;
    use crate::server::RealtimeEngine;

    const IDLE: Duration = Duration::from_secs(60);

    fn engine() -> RealtimeEngine {
        RealtimeEngine::new(
            &AppConfig::default(),
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryCallStore::new()),
        )
    }

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: UserId::new(),
            username: "dave".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_loop_pings_when_idle_and_closes_on_unregister() {
        let engine = engine();
        let (handle, outbound) = engine.registry.register(&user());
        let (sink, mut wire) = transport::unbounded::<Frame>();

        let writer = tokio::spawn(run_write_loop(
            sink,
            outbound,
            handle.clone(),
            engine.registry.clone(),
            IDLE,
        ));

        let started = tokio::time::Instant::now();
        assert_eq!(wire.next().await, Some(Frame::Ping(Vec::new())));
        assert!(started.elapsed() >= IDLE);

        engine
            .registry
            .send_to_connection(&handle.id, builder::build_heartbeat_ack());
        match wire.next().await {
            Some(Frame::Text(text)) => assert!(text.contains("heartbeat_ack")),
            other => panic!("expected text frame, got {other:?}"),
        }

        engine.registry.unregister(&handle.id);
        writer.await.expect("writer");
        assert_eq!(wire.next().await, Some(Frame::Close));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_tears_connection_down() {
        let engine = engine();
        let user = user();
        let (handle, outbound) = engine.registry.register(&user);
        let (sink, wire) = transport::unbounded::<Frame>();
        drop(wire);

        let writer = tokio::spawn(run_write_loop(
            sink,
            outbound,
            handle.clone(),
            engine.registry.clone(),
            IDLE,
        ));
        engine
            .registry
            .send_to_connection(&handle.id, builder::build_heartbeat_ack());

        writer.await.expect("writer");
        assert!(!handle.is_alive());
        assert!(!engine.registry.is_connected(&user.user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_hits_read_deadline() {
        let engine = engine();
        let user = user();
        let (handle, _outbound) = engine.registry.register(&user);
        let (_peer, stream) = transport::unbounded::<Result<Frame, Infallible>>();
        let deadline = Duration::from_secs(90);

        let started = tokio::time::Instant::now();
        run_read_loop(
            stream,
            handle.clone(),
            engine.registry.clone(),
            engine.dispatcher.clone(),
            deadline,
        )
        .await;

        assert!(started.elapsed() >= deadline);
        assert!(!handle.is_alive());
        assert!(!engine.registry.is_connected(&user.user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_binary_frame_is_answered_with_error() {
        let engine = engine();
        let (handle, mut outbound) = engine.registry.register(&user());
        let (peer, stream) = transport::unbounded::<Result<Frame, Infallible>>();

        peer.unbounded_send(Ok(Frame::Binary(vec![0xde, 0xad])))
            .expect("send");
        peer.unbounded_send(Ok(Frame::Text(r#"{"kind":"heartbeat"}"#.to_string())))
            .expect("send");
        peer.unbounded_send(Ok(Frame::Close)).expect("send");

        run_read_loop(
            stream,
            handle.clone(),
            engine.registry.clone(),
            engine.dispatcher.clone(),
            Duration::from_secs(90),
        )
        .await;

        let error = outbound.try_recv().expect("error signal");
        assert_eq!(error.kind, SignalKind::Error);
        assert_eq!(error.payload["code"], "INVALID_MESSAGE");
        // The loop kept reading after the binary frame.
        assert_eq!(
            outbound.try_recv().map(|msg| msg.kind),
            Ok(SignalKind::HeartbeatAck)
        );
        assert!(!handle.is_alive());
    }
}
