//! Presence and engine statistics handlers.

use axum::Json;
use axum::extract::{Path, State};

use callhub_core::types::UserId;

use crate::dto::response::{
    ApiResponse, OnlineFriendsResponse, PresenceResponse, RealtimeStatsResponse,
};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Json<ApiResponse<PresenceResponse>> {
    let presence = &state.engine.presence;
    Json(ApiResponse::ok(PresenceResponse {
        user_id,
        online: presence.is_online(user_id),
        last_seen: presence.last_seen(user_id),
    }))
}

/// GET /api/presence/me/friends
pub async fn online_friends(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<OnlineFriendsResponse>>, ApiError> {
    let online_friends = state.engine.presence.online_friends(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(OnlineFriendsResponse { online_friends })))
}

/// GET /api/realtime/stats
pub async fn realtime_stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<ApiResponse<RealtimeStatsResponse>> {
    let stats = state.engine.stats().await;
    Json(ApiResponse::ok(RealtimeStatsResponse {
        total_connections: stats.total_connections,
        active_rooms: stats.active_rooms,
        connected_users: stats.connected_users,
        online_users: stats.online_users,
        live_calls: stats.live_calls,
        metrics: stats.metrics,
    }))
}
