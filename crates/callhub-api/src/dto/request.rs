//! Request DTOs.

use serde::Deserialize;

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Access token. A missing token is rejected by the authenticator.
    pub token: Option<String>,
}

/// Query parameters for call history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of calls to return.
    pub limit: Option<u32>,
}
