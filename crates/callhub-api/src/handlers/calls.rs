//! Call query handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use callhub_core::types::{CallId, CallRecord};

use crate::dto::request::HistoryQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/calls/{call_id}
pub async fn get_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<CallId>,
) -> Result<Json<ApiResponse<CallRecord>>, ApiError> {
    let call = state.engine.calls.get_call(auth.user_id, call_id).await?;
    Ok(Json(ApiResponse::ok(call)))
}

/// GET /api/calls/active
pub async fn active_call(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<ApiResponse<Option<CallRecord>>> {
    Json(ApiResponse::ok(
        state.engine.calls.active_call_for(auth.user_id).await,
    ))
}

/// GET /api/calls/history?limit=
pub async fn call_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<CallRecord>>>, ApiError> {
    let calls = state
        .engine
        .calls
        .history(auth.user_id, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(calls)))
}
