//! WebSocket upgrade and the per-connection relay loop.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sketchsync_core::sync::{ClientMessage, ServerMessage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::auth::{Identity, WsQuery};

/// Authenticate, then upgrade. Bad credentials get a 401 before the handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(board_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(identity) = state.auth.authenticate(&board_id, &query) else {
        warn!("Rejected connection to board {}", board_id);
        return StatusCode::UNAUTHORIZED.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, board_id, identity, state))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode message: {}", e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, board_id: String, identity: Identity, state: Arc<AppState>) {
    let user_id = identity.user_id.clone();
    let joined = state.rooms.join(&board_id, &identity);
    let mut rx = joined.rx;
    info!("User {} ({}) joined board {}", identity.username, user_id, board_id);

    let (mut sender, mut receiver) = socket.split();

    // The joiner always gets the board first, even when it is empty.
    let initial = ServerMessage::SyncState {
        elements: joined.elements,
    };
    let opened = match encode(&initial) {
        Some(frame) => sender.send(frame).await.is_ok(),
        None => false,
    };

    if opened {
        state.rooms.announce_join(&board_id, &joined.user);

        loop {
            tokio::select! {
                msg = receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(text.as_str()) {
                                Ok(client_msg) => {
                                    state.rooms.apply(&board_id, &user_id, client_msg);
                                }
                                Err(e) => warn!("Invalid message from {}: {}", user_id, e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(Message::Binary(_))) => debug!("Ignoring binary frame from {}", user_id),
                        Some(Ok(_)) => {} // Ignore ping/pong
                        Some(Err(e)) => {
                            warn!("WebSocket error for {}: {}", user_id, e);
                            break;
                        }
                    }
                }

                envelope = rx.recv() => {
                    match envelope {
                        Ok(envelope) => {
                            // Don't echo back to sender
                            if !envelope.is_for(&user_id) {
                                continue;
                            }
                            let Some(frame) = encode(&envelope.message) else {
                                continue;
                            };
                            if sender.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("{} lagged behind board {} by {} messages", user_id, board_id, skipped);
                            // Skipped edits are unrecoverable; resend the whole board.
                            let resync = ServerMessage::SyncState {
                                elements: state.rooms.elements(&board_id),
                            };
                            if let Some(frame) = encode(&resync) {
                                if sender.send(frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    state.rooms.leave(&board_id, &user_id);
    info!("User {} left board {}", user_id, board_id);
}
