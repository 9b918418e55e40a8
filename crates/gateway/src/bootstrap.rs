//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;

use sb_domain::config::{Config, ConfigSeverity};
use sb_responder::{GeminiResponder, Responder};
use sb_store::{ChatStore, FileStore};

use crate::live::auth::AdminAuth;
use crate::live::queue::WaitingQueue;
use crate::live::registry::ConnectionRegistry;
use crate::live::router::Router;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Chat store ───────────────────────────────────────────────────
    let store: Arc<dyn ChatStore> = Arc::new(
        FileStore::open(&config.store.state_path)
            .await
            .context("opening chat store")?,
    );
    tracing::info!(path = %config.store.state_path.display(), "chat store ready");

    // ── Automated responder ──────────────────────────────────────────
    let responder: Arc<dyn Responder> = Arc::new(
        GeminiResponder::from_config(&config.responder).context("initializing responder")?,
    );
    tracing::info!(model = %config.responder.model, "responder ready");

    // ── Live chat core ───────────────────────────────────────────────
    let registry = Arc::new(ConnectionRegistry::new());
    let queue = Arc::new(WaitingQueue::new());
    let router = Arc::new(Router::new(
        registry.clone(),
        queue.clone(),
        store.clone(),
        responder.clone(),
        &config,
    ));
    tracing::info!("connection registry + waiting queue + router ready");

    // ── Admin auth (startup-computed) ────────────────────────────────
    let admin_auth = Arc::new(AdminAuth::from_env(&config.auth));

    Ok(AppState {
        config,
        store,
        responder,
        registry,
        queue,
        router,
        admin_auth,
    })
}
