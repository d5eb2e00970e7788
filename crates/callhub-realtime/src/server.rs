//! Top-level real-time engine that ties together all subsystems.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use callhub_core::config::{AppConfig, RealtimeConfig};
use callhub_core::error::AppError;
use callhub_core::traits::{CallStore, UserDirectory};
use callhub_core::types::{AuthenticatedUser, UserId};

use crate::call::manager::CallManager;
use crate::connection::events::ConnectionEvent;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::session;
use crate::dispatcher::SignalDispatcher;
use crate::message::builder;
use crate::message::types::Frame;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::listener::FriendPresenceNotifier;
use crate::presence::sweeper;
use crate::presence::tracker::PresenceTracker;
use crate::room::manager::RoomManager;
use crate::room::room::Participant;

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeStats {
    /// Live connections.
    pub total_connections: usize,
    /// Users with a live connection.
    pub connected_users: usize,
    /// Rooms currently alive.
    pub active_rooms: usize,
    /// Users whose heartbeat has not timed out.
    pub online_users: usize,
    /// Ringing or ongoing calls.
    pub live_calls: usize,
    /// Counters.
    pub metrics: MetricsSnapshot,
}

/// Central real-time engine that coordinates all signaling subsystems.
pub struct RealtimeEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Room manager.
    pub rooms: Arc<RoomManager>,
    /// Call state machine.
    pub calls: Arc<CallManager>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Inbound dispatcher.
    pub dispatcher: Arc<SignalDispatcher>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Connection-level settings.
    config: RealtimeConfig,
    /// Presence sweep period.
    sweep_interval: Duration,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    /// Registry events, until the dispatch task takes them.
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    /// Background tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: &AppConfig,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn CallStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let (registry, events_rx) = ConnectionRegistry::new(&config.realtime, metrics.clone());
        let registry = Arc::new(registry);
        let rooms = Arc::new(RoomManager::new(
            registry.clone(),
            config.call.max_room_participants,
        ));
        let presence = Arc::new(PresenceTracker::new(
            &config.presence,
            directory.clone(),
            Arc::new(FriendPresenceNotifier::new(registry.clone())),
            metrics.clone(),
        ));
        let calls = Arc::new(CallManager::new(
            config.call.clone(),
            store,
            directory,
            rooms.clone(),
            registry.clone(),
            metrics.clone(),
        ));
        let dispatcher = Arc::new(SignalDispatcher::new(
            registry.clone(),
            rooms.clone(),
            calls.clone(),
            presence.clone(),
            metrics.clone(),
            config.realtime.max_message_size,
        ));

        info!("Real-time engine initialized");

        Self {
            registry,
            rooms,
            calls,
            presence,
            dispatcher,
            metrics,
            config: config.realtime.clone(),
            sweep_interval: config.presence.sweep_interval(),
            shutdown_tx,
            events_rx: Mutex::new(Some(events_rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the registry event dispatch task and the presence sweeper.
    ///
    /// Calling it again is a no-op.
    pub async fn start(&self) {
        let Some(events) = self.events_rx.lock().await.take() else {
            return;
        };

        let dispatch = tokio::spawn(run_event_loop(
            events,
            self.calls.clone(),
            self.presence.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let sweep = sweeper::spawn_sweeper(
            self.presence.clone(),
            self.sweep_interval,
            self.shutdown_tx.subscribe(),
        );

        self.tasks.lock().await.extend([dispatch, sweep]);
        info!("Real-time engine started");
    }

    /// Serves one authenticated connection until it closes.
    ///
    /// Registers the connection (closing any previous one for the same
    /// user), greets it with `connected`, marks the user online, runs the
    /// write loop on its own task and the read loop on this one.
    pub async fn run_connection<St, Si, E>(&self, user: AuthenticatedUser, stream: St, sink: Si)
    where
        St: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
        Si: Sink<Frame> + Unpin + Send + 'static,
        Si::Error: Display,
    {
        let (handle, outbound) = self.registry.register(&user);
        self.registry.send_to_connection(
            &handle.id,
            builder::build_connected(handle.id, user.user_id),
        );

        let writer = tokio::spawn(session::run_write_loop(
            sink,
            outbound,
            handle.clone(),
            self.registry.clone(),
            self.config.idle_timeout(),
        ));

        self.presence.set_online(user.user_id, handle.id).await;

        session::run_read_loop(
            stream,
            handle.clone(),
            self.registry.clone(),
            self.dispatcher.clone(),
            self.config.read_deadline(),
        )
        .await;

        if let Err(e) = writer.await {
            warn!(conn_id = %handle.id, error = %e, "Write loop task failed");
        }
    }

    /// Marks a user offline and closes their connection.
    ///
    /// Returns `true` if the user was tracked or connected.
    pub async fn force_offline(&self, user_id: UserId) -> bool {
        let was_online = self.presence.set_offline(user_id).await;
        let was_connected = self.registry.close_user(&user_id);
        info!(user_id = %user_id, was_online, was_connected, "User forced offline");
        was_online || was_connected
    }

    /// Current engine statistics.
    pub async fn stats(&self) -> RealtimeStats {
        RealtimeStats {
            total_connections: self.registry.connection_count(),
            connected_users: self.registry.user_count(),
            active_rooms: self.rooms.room_count().await,
            online_users: self.presence.online_count(),
            live_calls: self.calls.live_count().await,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        self.registry.close_all();
        let _ = self.shutdown_tx.send(());

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task failed during shutdown");
            }
        }

        info!("Real-time engine shut down");
        Ok(())
    }
}

/// Consumes registry events and performs cross-subsystem teardown.
async fn run_event_loop(
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    calls: Arc<CallManager>,
    presence: Arc<PresenceTracker>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                while let Ok(event) = events.try_recv() {
                    handle_event(event, &calls, &presence).await;
                }
                break;
            }
            event = events.recv() => match event {
                Some(event) => handle_event(event, &calls, &presence).await,
                None => break,
            },
        }
    }
    debug!("Connection event loop stopped");
}

async fn handle_event(event: ConnectionEvent, calls: &CallManager, presence: &PresenceTracker) {
    match event {
        ConnectionEvent::Closed {
            connection_id,
            user_id,
            released_user,
        } => {
            calls
                .leave(Participant {
                    user_id,
                    connection_id,
                })
                .await;
            if released_user {
                presence.release_connection(user_id, connection_id).await;
            }
        }
    }
}
