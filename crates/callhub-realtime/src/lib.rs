//! # callhub-realtime
//!
//! Real-time signaling core for CallHub. Provides:
//!
//! - Connection registry with one live connection per user and bounded
//!   outbound queues
//! - Ephemeral rooms that fan signaling messages out to their members
//! - The call state machine (request, accept, decline, end, ring timeout)
//! - Heartbeat-driven presence tracking with a periodic sweep
//! - Inbound message dispatch and engine-level metrics

pub mod call;
pub mod connection;
pub mod dispatcher;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod room;
pub mod server;

pub use call::manager::CallManager;
pub use connection::registry::ConnectionRegistry;
pub use dispatcher::SignalDispatcher;
pub use metrics::RealtimeMetrics;
pub use presence::tracker::PresenceTracker;
pub use room::manager::RoomManager;
pub use server::RealtimeEngine;
