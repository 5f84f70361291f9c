// libs/chat-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use shared_utils::jwt::validate_token;

use crate::models::{ChatParticipant, ServerEvent};
use crate::router::ChatState;
use crate::services::presence::{
    OutboundFrame, CLOSE_SUPERSEDED, CLOSE_TOKEN_INVALID, CLOSE_USER_NOT_FOUND,
};
use crate::services::ChatDeliveryService;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Upgrade point for `/ws/chat?token=...`. Browsers cannot set headers on
/// a WebSocket handshake, so the JWT rides in the query string and is
/// checked after the upgrade.
pub async fn ws_handler(
    State(state): State<ChatState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(mut socket: WebSocket, state: ChatState, token: Option<String>) {
    let Some(token) = token else {
        close_with(&mut socket, CLOSE_TOKEN_INVALID, "Missing token").await;
        return;
    };

    let user = match validate_token(&token, &state.config.supabase_jwt_secret) {
        Ok(user) => user,
        Err(reason) => {
            debug!("Rejecting socket: {}", reason);
            close_with(&mut socket, CLOSE_TOKEN_INVALID, "Invalid token").await;
            return;
        }
    };

    // The token may outlive the account; presence only admits users that
    // still exist in the directory.
    let directory =
        directory_cell::services::DirectoryService::with_client(Arc::clone(&state.supabase));
    let account = match directory.get_user_account(&user.id, Some(&token)).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            close_with(&mut socket, CLOSE_USER_NOT_FOUND, "User not found").await;
            return;
        }
        Err(e) => {
            warn!("Directory lookup failed during socket setup: {}", e);
            close_with(&mut socket, 1011, "Setup failed").await;
            return;
        }
    };

    let participant = ChatParticipant {
        id: user.id.clone(),
        username: account.username.clone(),
    };

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OutboundFrame>();

    let conn_id = state
        .presence
        .register(&participant.id, &participant.username, tx)
        .await;
    info!("User {} connected to chat as {}", participant.id, conn_id);

    let roster = state.presence.roster().await;
    state
        .presence
        .send_to(&participant.id, &ServerEvent::ActiveUserList(roster))
        .await;
    state
        .presence
        .send_to(
            &participant.id,
            &ServerEvent::Info(format!("Connected as {}", participant.username)),
        )
        .await;
    state
        .presence
        .broadcast_except(
            &ServerEvent::UserJoined(participant.clone()),
            &participant.id,
        )
        .await;

    // Writer: drains this connection's queue into the socket. A Close
    // frame (the superseded signal) ends the task.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    let delivery = ChatDeliveryService::new(Arc::clone(&state.supabase), state.presence.clone());
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(raw) => {
                delivery
                    .handle_incoming(&participant, raw.as_str(), &token)
                    .await;
            }
            Message::Close(_) => break,
            // Pings are answered by the library; everything else is ignored.
            _ => {}
        }
    }

    writer.abort();

    // Only the connection of record announces the departure; a superseded
    // socket closing late must not mark the replacement offline.
    if state.presence.deregister(&participant.id, conn_id).await {
        info!("User {} left chat", participant.id);
        state
            .presence
            .broadcast(&ServerEvent::UserLeft {
                user_id: participant.id.clone(),
            })
            .await;
        let roster = state.presence.roster().await;
        state
            .presence
            .broadcast(&ServerEvent::ActiveUserList(roster))
            .await;
    } else {
        debug!(
            "Connection {} for user {} was superseded (code {})",
            conn_id, participant.id, CLOSE_SUPERSEDED
        );
    }
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}
