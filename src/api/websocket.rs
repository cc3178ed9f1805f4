//! WebSocket handler for the voice session channel

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::ApiState;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::responder::Responder;

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(
    State(state): State<Arc<ApiState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Send connected message
    let connected = ServerMessage::Connected {
        session_id: session_id.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    tracing::info!(session_id = %session_id, "WebSocket connected");

    // Create channel for sending messages back to client
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // Spawn task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    let session_id_clone = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = handle_message(&text, &state, &session_id_clone, &tx).await {
                        tracing::debug!(session_id = %session_id_clone, error = %e, "rejected frame");
                        let error = ServerMessage::Error {
                            code: "invalid_message".to_string(),
                            message: e.to_string(),
                        };
                        let _ = tx.send(error).await;
                    }
                }
                Message::Ping(data) => {
                    // axum handles pong automatically
                    tracing::trace!(len = data.len(), "received ping");
                }
                Message::Close(_) => {
                    tracing::info!(session_id = %session_id_clone, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(session_id = %session_id, "WebSocket disconnected");
}

/// Handle a single incoming frame
async fn handle_message(
    text: &str,
    state: &Arc<ApiState>,
    session_id: &str,
    tx: &mpsc::Sender<ServerMessage>,
) -> crate::Result<()> {
    let incoming: ClientMessage = serde_json::from_str(text)
        .map_err(|e| crate::Error::Channel(format!("invalid message: {e}")))?;

    let reply = reply_for(&state.responder, incoming);
    tracing::debug!(session_id = %session_id, kind = reply.kind(), "sending reply");

    tx.send(reply)
        .await
        .map_err(|_| crate::Error::Channel("channel closed".to_string()))
}

/// Map one client message to the server message it produces
#[must_use]
pub fn reply_for(responder: &Responder, incoming: ClientMessage) -> ServerMessage {
    match incoming {
        ClientMessage::UtteranceSubmitted { text, request_id } => {
            ServerMessage::response(responder.generate(&text), request_id)
        }
        ClientMessage::InterruptRequested => ServerMessage::PauseRequested,
        ClientMessage::ResumeRequested => ServerMessage::ResumeRequested,
        ClientMessage::Ping => ServerMessage::Pong,
    }
}
