//! Session management API endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use sb_domain::trace::TraceEvent;
use sb_domain::types::ClientInfo;

use crate::state::AppState;

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Request body for session creation.
#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub client_info: ClientInfo,
}

/// Create a new chat session from the client's contact details.
///
/// Returns the record whose `session_id` the client uses to open its
/// WebSocket connection.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Response {
    match state.store.create_session(body.client_info).await {
        Ok(record) => {
            TraceEvent::SessionCreated {
                session_id: record.session_id.clone(),
                client_name: record.client.name.clone(),
            }
            .emit();
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "session creation failed");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session",
            )
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/sessions/:session_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.get_session(&session_id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "Session not found"),
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed")
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/sessions/:session_id/messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Full transcript of a session, oldest message first.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.get_session(&session_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "Session not found"),
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed");
        }
    }

    match state.store.messages(&session_id).await {
        Ok(messages) => Json(messages).into_response(),
        Err(err) => {
            tracing::error!(session_id = %session_id, error = %err, "transcript read failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Transcript read failed")
        }
    }
}
