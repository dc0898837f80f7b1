// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ApiError, AppState};
use crate::auth;
use crate::notify::Notification;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// Messages a client may send over the socket.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    action: String,
    #[serde(default)]
    user_id: i32,
    #[serde(default)]
    message: String,
}

/// Upgrade to a WebSocket scoped to the token's user. Auth rides in the
/// `?token=` query parameter since browsers cannot set headers here.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::Unauthorized("No token".to_string()))?;
    let user_id = auth::validate_token(&token)
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)))
}

async fn handle_socket(socket: WebSocket, user_id: i32, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let handle = state.notify.register(user_id, tx);
    debug!("WebSocket opened for user {}", user_id);

    // Forward queued notifications onto the socket until either side goes
    // away.
    let writer = tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            let Ok(payload) = serde_json::to_string(&notification) else {
                continue;
            };
            if ws_tx.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    // Read loop: malformed frames are ignored, a read error ends the
    // session.
    while let Some(Ok(message)) = ws_rx.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
            continue;
        };

        if client_msg.action == "send_to_user"
            && client_msg.user_id != 0
            && !client_msg.message.is_empty()
        {
            state.notify.notify(
                client_msg.user_id,
                Notification::new("message", "system", client_msg.message),
            );
        }
    }

    state.notify.unregister(user_id, handle);
    writer.abort();
    debug!("WebSocket closed for user {}", user_id);
}
