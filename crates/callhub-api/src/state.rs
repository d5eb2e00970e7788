//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use callhub_core::config::AppConfig;
use callhub_core::traits::CredentialService;
use callhub_realtime::connection::authenticator::ConnectionAuthenticator;
use callhub_realtime::server::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Signaling engine
    pub engine: Arc<RealtimeEngine>,
    /// Bearer token verifier for HTTP routes
    pub credentials: Arc<dyn CredentialService>,
    /// Token verifier for WebSocket upgrades
    pub authenticator: ConnectionAuthenticator,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state from its parts.
    pub fn new(
        config: Arc<AppConfig>,
        engine: Arc<RealtimeEngine>,
        credentials: Arc<dyn CredentialService>,
    ) -> Self {
        Self {
            config,
            engine,
            authenticator: ConnectionAuthenticator::new(credentials.clone()),
            credentials,
            started_at: Instant::now(),
        }
    }
}
