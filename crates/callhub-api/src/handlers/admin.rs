//! Admin handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use callhub_core::types::UserId;
use callhub_realtime::connection::ConnectionInfo;

use crate::dto::response::{ApiResponse, ForceOfflineResponse};
use crate::extractors::AdminUser;
use crate::state::AppState;

/// GET /api/admin/connections
pub async fn list_connections(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Json<ApiResponse<Vec<ConnectionInfo>>> {
    Json(ApiResponse::ok(state.engine.registry.connections()))
}

/// POST /api/admin/presence/{user_id}/offline
pub async fn force_offline(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<UserId>,
) -> Json<ApiResponse<ForceOfflineResponse>> {
    let was_online = state.engine.force_offline(user_id).await;
    info!(admin_id = %admin.user_id, user_id = %user_id, was_online, "Admin forced user offline");
    Json(ApiResponse::ok(ForceOfflineResponse {
        user_id,
        was_online,
    }))
}
