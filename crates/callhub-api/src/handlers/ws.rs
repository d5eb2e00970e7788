//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt, future};
use tracing::info;

use callhub_core::types::AuthenticatedUser;
use callhub_realtime::message::Frame;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?token={jwt}: WebSocket upgrade
///
/// The token is verified before the upgrade; a bad token never gets a
/// connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let user = state
        .authenticator
        .authenticate(query.token.as_deref())
        .await?;

    let max_size = state.config.realtime.max_message_size;
    Ok(ws
        .max_message_size(max_size)
        .on_upgrade(move |socket| serve_socket(state, user, socket)))
}

/// Hands an established WebSocket to the engine.
async fn serve_socket(state: AppState, user: AuthenticatedUser, socket: WebSocket) {
    let user_id = user.user_id;
    info!(user_id = %user_id, username = %user.username, "WebSocket connection established");

    let (ws_tx, ws_rx) = socket.split();
    let sink = ws_tx.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_message(frame))));
    let stream = ws_rx.map(|result| result.map(to_frame));

    state.engine.run_connection(user, stream, sink).await;

    info!(user_id = %user_id, "WebSocket connection closed");
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
        Frame::Ping(data) => Message::Ping(data.into()),
        Frame::Pong(data) => Message::Pong(data.into()),
        Frame::Close => Message::Close(None),
    }
}

fn to_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(data) => Frame::Binary(data.to_vec()),
        Message::Ping(data) => Frame::Ping(data.to_vec()),
        Message::Pong(data) => Frame::Pong(data.to_vec()),
        Message::Close(_) => Frame::Close,
    }
}
