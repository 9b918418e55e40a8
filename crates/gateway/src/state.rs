use std::sync::Arc;

use sb_domain::config::Config;
use sb_responder::Responder;
use sb_store::ChatStore;

use crate::live::auth::AdminAuth;
use crate::live::queue::WaitingQueue;
use crate::live::registry::ConnectionRegistry;
use crate::live::router::Router;

/// Shared application state passed to all HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub store: Arc<dyn ChatStore>,
    pub responder: Arc<dyn Responder>,

    // ── Live chat ─────────────────────────────────────────────────────
    pub registry: Arc<ConnectionRegistry>,
    pub queue: Arc<WaitingQueue>,
    pub router: Arc<Router>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// Admin credential set, read once from the environment.
    pub admin_auth: Arc<AdminAuth>,
}
