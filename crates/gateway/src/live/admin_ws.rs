//! Admin-side WebSocket endpoint.
//!
//! One connection per admin; every session the admin handles is
//! multiplexed over it. Credentials are checked before the session loop
//! starts; a failed check gets a 4001 close frame.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use sb_protocol::{AdminEvent, AdminFrame, CLOSE_UNAUTHORIZED};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminWsQuery {
    /// Admin credential, per the configured auth mode.
    pub token: Option<String>,
    /// Admin identity. Required unless per-admin tokens are configured,
    /// in which case the token itself resolves the identity.
    pub admin_id: Option<String>,
}

/// GET /ws/admin — upgrade to WebSocket.
pub async fn admin_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<AdminWsQuery>,
) -> impl IntoResponse {
    let auth = state
        .admin_auth
        .authenticate(query.token.as_deref(), query.admin_id.as_deref());
    ws.on_upgrade(move |mut socket| async move {
        match auth {
            Ok(admin_id) => handle_socket(socket, state, admin_id).await,
            Err(reason) => {
                tracing::warn!(reason, "admin connection rejected");
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_UNAUTHORIZED,
                        reason: reason.into(),
                    })))
                    .await;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, admin_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<AdminEvent>(64);

    // Writer task: forwards outbound channel events to the WS sink.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    state.router.on_admin_connect(&admin_id, outbound_tx).await;

    // Reader loop: dispatch admin actions. Unknown frame types fail to
    // parse and are ignored, keeping the protocol forward-compatible.
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<AdminFrame>(&text) {
                Ok(frame) => state.router.on_admin_frame(&admin_id, frame).await,
                Err(_) => {
                    tracing::debug!(admin_id = %admin_id, "ignoring unparseable admin frame");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.router.on_admin_disconnect(&admin_id).await;
    writer.abort();
    tracing::info!(admin_id = %admin_id, "admin disconnected");
}
