//! Client-side WebSocket endpoint.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use sb_domain::types::SessionState;
use sb_protocol::{CLOSE_SESSION_CLOSED, CLOSE_SESSION_NOT_FOUND, ClientFrame};
use tokio::sync::mpsc;

use crate::live::registry::ClientPush;
use crate::state::AppState;

/// GET /ws/client/:session_id — upgrade to WebSocket.
///
/// The session must exist and be open; unknown and closed sessions are
/// rejected with a coded close frame right after the upgrade.
pub async fn client_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, session_id: String) {
    let record = match state.store.get_session(&session_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            close_with(&mut socket, CLOSE_SESSION_NOT_FOUND, "Session not found").await;
            return;
        }
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
            close_with(&mut socket, 1011, "Internal error").await;
            return;
        }
    };
    if record.state == SessionState::Closed {
        close_with(&mut socket, CLOSE_SESSION_CLOSED, "Session closed").await;
        return;
    }

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientPush>(64);

    // Writer task: forwards outbound channel pushes to the WS sink.
    let writer = tokio::spawn(async move {
        while let Some(push) = outbound_rx.recv().await {
            match push {
                ClientPush::Event(event) => {
                    let Ok(json) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                ClientPush::Close { code, reason } => {
                    let _ = ws_sink
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

    state.router.on_client_connect(&record, outbound_tx).await;

    // Reader loop: route inbound frames.
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::Message { content }) => {
                    state.router.on_client_message(&session_id, &content).await;
                }
                Err(_) => {
                    tracing::debug!(session_id = %session_id, "ignoring unparseable client frame");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.router.on_client_disconnect(&session_id);
    writer.abort();
    tracing::info!(session_id = %session_id, "client disconnected");
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
