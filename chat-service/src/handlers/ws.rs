use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use shared::{current_locale, with_locale, Localizer};
use std::sync::Arc;
use stream_gateway::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::ApiError;
use crate::AppState;

/// Relay every message of a room stream, oldest first, as JSON text frames.
pub async fn room_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Response {
    // The upgraded socket runs on its own task, outside the request scope.
    let locale = current_locale();
    ws.on_upgrade(move |socket| with_locale(locale, relay_room(socket, state, room)))
}

async fn relay_room(socket: WebSocket, state: Arc<AppState>, room: String) {
    let (mut sender, mut receiver) = socket.split();

    let mut messages = match state.gateway.consume(&room, CancellationToken::new()).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!(room = %room, error = %e, "Failed to open room subscription");
            let body = ApiError::from(e)
                .into_business()
                .to_body(&Localizer::shared());
            if sender.send(Message::Text(body.to_string())).await.is_ok() {
                sender.close().await.ok();
            }
            return;
        }
    };
    info!(room = %room, "Client joined room");

    loop {
        tokio::select! {
            next = messages.next() => {
                let Some(message) = next else {
                    info!(room = %room, "Room subscription ended");
                    sender.close().await.ok();
                    break;
                };
                let frame = match serde_json::to_string(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(room = %room, error = %e, "Failed to serialize chat message");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    messages.close().await;
    info!(room = %room, "Client left room");
}
