//! Shared test helpers for integration tests.
//!
//! Connections run through the real engine over in-process channels
//! instead of sockets.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;
use serde_json::Value;
use tokio::task::JoinHandle;

use callhub_core::config::AppConfig;
use callhub_core::types::{AuthenticatedUser, UserId, UserRole};
use callhub_database::{MemoryCallStore, MemoryUserDirectory};
use callhub_realtime::RealtimeEngine;
use callhub_realtime::message::{Frame, SignalKind, SignalMessage};

/// How long a client waits for a message before giving up.
pub const WAIT: Duration = Duration::from_secs(5);

/// Engine wired to in-memory adapters
pub struct TestHub {
    /// The running engine
    pub engine: Arc<RealtimeEngine>,
    /// Directory shared with the engine
    pub directory: MemoryUserDirectory,
    /// Call store shared with the engine
    pub store: MemoryCallStore,
}

impl TestHub {
    /// Create a started engine with default configuration
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Create a started engine with the given configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let directory = MemoryUserDirectory::new();
        let store = MemoryCallStore::new();
        let engine = Arc::new(RealtimeEngine::new(
            &config,
            Arc::new(directory.clone()),
            Arc::new(store.clone()),
        ));
        engine.start().await;

        Self {
            engine,
            directory,
            store,
        }
    }

    /// Add an active user to the directory
    pub async fn user(&self, username: &str) -> AuthenticatedUser {
        let user_id = self.directory.add_user(username).await;
        AuthenticatedUser {
            user_id,
            username: username.to_string(),
            role: UserRole::User,
        }
    }

    /// Make two users friends
    pub async fn befriend(&self, a: &AuthenticatedUser, b: &AuthenticatedUser) {
        self.directory.add_friendship(a.user_id, b.user_id).await;
    }

    /// Open a connection and wait for the `connected` greeting
    pub async fn connect(&self, user: &AuthenticatedUser) -> TestClient {
        let (to_server, server_rx) = mpsc::unbounded::<Result<Frame, Infallible>>();
        let (server_tx, from_server) = mpsc::unbounded::<Frame>();

        let engine = self.engine.clone();
        let identity = user.clone();
        let task = tokio::spawn(async move {
            engine.run_connection(identity, server_rx, server_tx).await;
        });

        let mut client = TestClient {
            user_id: user.user_id,
            to_server,
            from_server,
            pending: VecDeque::new(),
            task,
        };
        client.expect(SignalKind::Connected).await;
        client
    }
}

/// Client side of an in-process connection
pub struct TestClient {
    /// Authenticated user
    pub user_id: UserId,
    to_server: mpsc::UnboundedSender<Result<Frame, Infallible>>,
    from_server: mpsc::UnboundedReceiver<Frame>,
    pending: VecDeque<SignalMessage>,
    task: JoinHandle<()>,
}

impl TestClient {
    /// Send a JSON envelope
    pub fn send(&self, msg: Value) {
        self.send_raw(&msg.to_string());
    }

    /// Send an arbitrary text frame
    pub fn send_raw(&self, text: &str) {
        let _ = self
            .to_server
            .unbounded_send(Ok(Frame::Text(text.to_string())));
    }

    /// Next message within `wait`, or `None` if nothing arrived or the
    /// connection closed
    pub async fn recv_within(&mut self, wait: Duration) -> Option<SignalMessage> {
        if let Some(msg) = self.pending.pop_front() {
            return Some(msg);
        }
        self.read_within(wait).await
    }

    async fn read_within(&mut self, wait: Duration) -> Option<SignalMessage> {
        loop {
            match tokio::time::timeout(wait, self.from_server.next()).await {
                Ok(Some(Frame::Text(text))) => {
                    return Some(serde_json::from_str(&text).expect("valid envelope"));
                }
                Ok(Some(Frame::Ping(_) | Frame::Pong(_) | Frame::Binary(_))) => continue,
                Ok(Some(Frame::Close)) | Ok(None) | Err(_) => return None,
            }
        }
    }

    /// First message of `kind`; other messages are kept for later
    pub async fn expect(&mut self, kind: SignalKind) -> SignalMessage {
        self.expect_within(kind, WAIT).await
    }

    /// Like [`expect`](Self::expect) with a custom wait
    pub async fn expect_within(&mut self, kind: SignalKind, wait: Duration) -> SignalMessage {
        if let Some(pos) = self.pending.iter().position(|m| m.kind == kind) {
            if let Some(msg) = self.pending.remove(pos) {
                return msg;
            }
        }
        loop {
            let msg = self
                .read_within(wait)
                .await
                .unwrap_or_else(|| panic!("no {kind} message for user {}", self.user_id));
            if msg.kind == kind {
                return msg;
            }
            self.pending.push_back(msg);
        }
    }

    /// Whether the server closes this connection within [`WAIT`]
    pub async fn closed(&mut self) -> bool {
        loop {
            match tokio::time::timeout(WAIT, self.from_server.next()).await {
                Ok(Some(Frame::Close)) | Ok(None) => return true,
                Ok(Some(_)) => continue,
                Err(_) => return false,
            }
        }
    }

    /// Drop the client side and wait for the server to finish
    pub async fn disconnect(self) {
        drop(self.to_server);
        let _ = self.task.await;
    }
}

/// Polls `check` until it holds, panicking after a while
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..250 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}
