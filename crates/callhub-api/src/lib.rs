//! # callhub-api
//!
//! HTTP API layer for CallHub built on Axum.
//!
//! Provides the WebSocket upgrade for signaling connections, presence and
//! call query endpoints, the admin force-offline route, health checks,
//! extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
