pub mod health;
pub mod sessions;

use axum::Router;
use axum::routing::{get, post};

use crate::live;
use crate::state::AppState;

/// Build the full API router: session REST endpoints plus the two live
/// WebSocket endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        // Sessions (REST)
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/:session_id", get(sessions::get_session))
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_messages),
        )
        // Live chat (WebSocket)
        .route("/ws/client/:session_id", get(live::client_ws::client_ws))
        .route("/ws/admin", get(live::admin_ws::admin_ws))
        // Health probe
        .route("/health", get(health::health))
}
