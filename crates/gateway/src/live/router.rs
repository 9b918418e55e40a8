//! Message routing core.
//!
//! The router owns the decision of where every inbound message goes next:
//! the automated responder, the assigned admin, or the waiting queue. It
//! mutates session state through the store (durable write first, in-memory
//! structures after) and pushes all outbound events through the registry.
//! It holds no locks of its own and never touches a transport handle
//! directly.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sb_domain::config::Config;
use sb_domain::error::Error;
use sb_domain::trace::TraceEvent;
use sb_domain::types::{MessageRecord, SenderKind, SessionRecord, SessionState};
use sb_protocol::{AdminEvent, AdminFrame, ClientEvent};
use sb_responder::{FALLBACK_REPLY, HandoffDetector, Responder};
use sb_store::ChatStore;

use crate::live::queue::WaitingQueue;
use crate::live::registry::{AdminSink, ClientSink, ConnectionRegistry};

pub const CLIENT_WELCOME: &str = "Welcome! How can I help you today?";
pub const HANDOFF_ACK: &str = "I'll connect you with a human agent. Please wait...";
pub const WAITING_NOTICE: &str = "Waiting for an agent to connect...";
pub const CLOSED_NOTICE: &str = "This conversation has been closed. Thank you!";

pub struct Router {
    registry: Arc<ConnectionRegistry>,
    queue: Arc<WaitingQueue>,
    store: Arc<dyn ChatStore>,
    responder: Arc<dyn Responder>,
    handoff: HandoffDetector,
    knowledge: Option<String>,
    history_limit: usize,
}

impl Router {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        queue: Arc<WaitingQueue>,
        store: Arc<dyn ChatStore>,
        responder: Arc<dyn Responder>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            queue,
            store,
            responder,
            handoff: HandoffDetector::new(&config.handoff.extra_phrases),
            knowledge: config.responder.knowledge.clone(),
            history_limit: config.responder.history_limit,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Client side
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Register a freshly accepted client connection and greet it. The
    /// transport layer has already verified the session exists and is open.
    pub async fn on_client_connect(&self, record: &SessionRecord, sink: ClientSink) {
        self.registry.register_client(&record.session_id, sink);
        self.registry
            .send_to_client(
                &record.session_id,
                ClientEvent::Connected {
                    message: CLIENT_WELCOME.to_string(),
                    session_id: record.session_id.clone(),
                    state: record.state,
                },
            )
            .await;
    }

    /// Route one inbound client message: persist it, then hand it to the
    /// responder, the assigned admin, or the waiting queue depending on
    /// session state.
    pub async fn on_client_message(&self, session_id: &str, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        let record = match self.store.get_session(session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(session_id = %session_id, "message for unknown session dropped");
                return;
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
                return;
            }
        };

        match record.state {
            SessionState::Closed => {
                // Connect-time checks reject closed sessions; a message can
                // still race a concurrent close. Drop it.
                tracing::debug!(session_id = %session_id, "message on closed session ignored");
            }
            SessionState::Automated => {
                let matched = self.handoff.detect(content).map(str::to_string);

                // Snapshot history before the inbound message lands so the
                // responder prompt does not carry it twice.
                let history = if matched.is_none() {
                    match self.store.history(session_id, self.history_limit).await {
                        Ok(history) => history,
                        Err(err) => {
                            tracing::warn!(session_id = %session_id, error = %err, "history read failed, replying without context");
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };

                if !self.persist_inbound(session_id, content).await {
                    return;
                }

                match matched {
                    Some(phrase) => self.escalate(&record, &phrase).await,
                    None => self.answer_automated(&record, content, &history).await,
                }
            }
            SessionState::Human => {
                if !self.persist_inbound(session_id, content).await {
                    return;
                }
                self.relay_or_enqueue(&record, content).await;
            }
        }
    }

    /// Drop the client's live connection. The session record, any admin
    /// assignment, and any queue entry all survive for a later reconnect.
    pub fn on_client_disconnect(&self, session_id: &str) {
        self.registry.unregister_client(session_id);
    }

    async fn persist_inbound(&self, session_id: &str, content: &str) -> bool {
        if let Err(err) = self
            .store
            .create_message(session_id, SenderKind::Client, content)
            .await
        {
            tracing::error!(session_id = %session_id, error = %err, "failed to persist client message, not routing");
            return false;
        }
        true
    }

    /// AUTOMATED -> HUMAN: durable state write first, then enqueue and
    /// notify. A failed write leaves the session fully automated.
    async fn escalate(&self, record: &SessionRecord, phrase: &str) {
        let session_id = &record.session_id;
        if let Err(err) = self
            .store
            .set_session_state(session_id, SessionState::Human)
            .await
        {
            tracing::error!(session_id = %session_id, error = %err, "handoff state write failed");
            return;
        }

        self.queue.enqueue(session_id);
        TraceEvent::HandoffDetected {
            session_id: session_id.clone(),
            phrase: phrase.to_string(),
        }
        .emit();
        TraceEvent::SessionQueued {
            session_id: session_id.clone(),
            queue_len: self.queue.len(),
        }
        .emit();

        self.registry
            .send_to_client(
                session_id,
                ClientEvent::HandoffRequested {
                    message: HANDOFF_ACK.to_string(),
                    sender_type: SenderKind::Assistant,
                },
            )
            .await;
        self.registry
            .broadcast_to_admins(
                AdminEvent::NewSessionQueued {
                    session_id: session_id.clone(),
                    client_name: record.client.name.clone(),
                    queue_size: self.queue.len(),
                },
                None,
            )
            .await;
    }

    async fn answer_automated(
        &self,
        record: &SessionRecord,
        content: &str,
        history: &[MessageRecord],
    ) {
        let session_id = &record.session_id;
        let started = Instant::now();
        let reply = self
            .responder
            .generate(content, history, self.knowledge.as_deref())
            .await;
        TraceEvent::ResponderReply {
            session_id: session_id.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            fallback: reply == FALLBACK_REPLY,
        }
        .emit();

        if let Err(err) = self
            .store
            .create_message(session_id, SenderKind::Assistant, &reply)
            .await
        {
            tracing::error!(session_id = %session_id, error = %err, "failed to persist responder reply, not relaying");
            return;
        }

        self.registry
            .send_to_client(
                session_id,
                ClientEvent::Message {
                    content: reply,
                    sender_type: SenderKind::Assistant,
                },
            )
            .await;
    }

    /// HUMAN-state message: relay to the owning admin if one is live,
    /// otherwise make sure the session is queued and tell the client to
    /// hold on.
    async fn relay_or_enqueue(&self, record: &SessionRecord, content: &str) {
        let session_id = &record.session_id;

        if let Some(admin_id) = self.registry.assigned_admin(session_id) {
            let delivered = self
                .registry
                .send_to_admin(
                    &admin_id,
                    AdminEvent::Message {
                        session_id: session_id.clone(),
                        content: content.to_string(),
                        sender_type: SenderKind::Client,
                        client_name: record.client.name.clone(),
                    },
                )
                .await;
            if delivered {
                return;
            }
            // The owning admin's connection is dead but its disconnect
            // cleanup has not run yet. Release the assignment here so the
            // session can be queued and claimed again.
            tracing::warn!(session_id = %session_id, admin_id = %admin_id, "assigned admin unreachable, releasing assignment");
            self.registry.unassign(session_id);
            if let Err(err) = self.store.clear_admin(session_id).await {
                tracing::warn!(session_id = %session_id, error = %err, "failed to clear admin assignment");
            }
        }

        if self.queue.enqueue(session_id) {
            TraceEvent::SessionQueued {
                session_id: session_id.clone(),
                queue_len: self.queue.len(),
            }
            .emit();
        }
        self.registry
            .send_to_client(
                session_id,
                ClientEvent::Waiting {
                    message: WAITING_NOTICE.to_string(),
                },
            )
            .await;
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Admin side
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Register an authenticated admin connection and send the greeting
    /// with the current queue.
    pub async fn on_admin_connect(&self, admin_id: &str, sink: AdminSink) {
        self.registry.register_admin(admin_id, sink);
        self.registry
            .send_to_admin(
                admin_id,
                AdminEvent::Connected {
                    message: format!("Welcome, {admin_id}!"),
                    queue_size: self.queue.len(),
                    queued_sessions: self.queue.snapshot(),
                },
            )
            .await;
    }

    pub async fn on_admin_frame(&self, admin_id: &str, frame: AdminFrame) {
        match frame {
            AdminFrame::ClaimSession { session_id } => {
                self.handle_claim(admin_id, &session_id).await;
            }
            AdminFrame::Message {
                session_id,
                content,
            } => {
                self.handle_admin_message(admin_id, &session_id, &content)
                    .await;
            }
            AdminFrame::CloseSession { session_id } => {
                self.handle_close(admin_id, &session_id).await;
            }
            AdminFrame::GetQueue => {
                self.registry
                    .send_to_admin(
                        admin_id,
                        AdminEvent::QueueUpdate {
                            queue_size: self.queue.len(),
                            queued_sessions: self.queue.snapshot(),
                        },
                    )
                    .await;
            }
        }
    }

    /// Drop the admin's connection and release every session it was
    /// handling. Released sessions stay HUMAN and are not re-queued; the
    /// client's next message queues them again.
    pub async fn on_admin_disconnect(&self, admin_id: &str) {
        let released = self.registry.unregister_admin(admin_id);
        for session_id in &released {
            if let Err(err) = self.store.clear_admin(session_id).await {
                tracing::warn!(session_id = %session_id, error = %err, "failed to clear admin assignment");
            }
        }
        if !released.is_empty() {
            TraceEvent::AdminVanished {
                admin_id: admin_id.to_string(),
                sessions_affected: released.len(),
            }
            .emit();
        }
    }

    async fn handle_claim(&self, admin_id: &str, session_id: &str) {
        let record = match self.store.get_session(session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.admin_error(admin_id, "Session not found").await;
                return;
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
                self.admin_error(admin_id, "Internal error").await;
                return;
            }
        };

        if record.state != SessionState::Human || record.assigned_admin.is_some() {
            self.admin_error(admin_id, "Session not available").await;
            return;
        }

        // Reserve in memory first so concurrent claims resolve to a single
        // winner, then make it durable. On a failed write the reservation
        // is rolled back and the session stays queued.
        if !self.registry.try_assign(session_id, admin_id) {
            self.admin_error(admin_id, "Session not available").await;
            return;
        }
        if let Err(err) = self.store.assign_admin(session_id, admin_id).await {
            self.registry.unassign(session_id);
            let message = match err {
                Error::SessionClosed(_) => "Session not available",
                _ => "Claim failed",
            };
            tracing::error!(session_id = %session_id, admin_id = %admin_id, error = %err, "claim write failed");
            self.admin_error(admin_id, message).await;
            return;
        }

        let wait_ms = self
            .queue
            .remove(session_id)
            .map(|queued_at| (Utc::now() - queued_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        TraceEvent::SessionClaimed {
            session_id: session_id.to_string(),
            admin_id: admin_id.to_string(),
            wait_ms,
        }
        .emit();

        self.registry
            .send_to_admin(
                admin_id,
                AdminEvent::SessionClaimed {
                    session_id: session_id.to_string(),
                    client_info: record.client.clone(),
                },
            )
            .await;
        self.registry
            .send_to_client(
                session_id,
                ClientEvent::AgentConnected {
                    message: format!("You're now connected with {admin_id}"),
                },
            )
            .await;
        self.registry
            .broadcast_to_admins(
                AdminEvent::SessionClaimedByOther {
                    session_id: session_id.to_string(),
                    queue_size: self.queue.len(),
                },
                Some(admin_id),
            )
            .await;
    }

    async fn handle_admin_message(&self, admin_id: &str, session_id: &str, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        match self.store.get_session(session_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.admin_error(admin_id, "Session not found").await;
                return;
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
                self.admin_error(admin_id, "Internal error").await;
                return;
            }
        }

        if let Err(err) = self
            .store
            .create_message(session_id, SenderKind::Agent, content)
            .await
        {
            tracing::error!(session_id = %session_id, error = %err, "failed to persist agent message, not relaying");
            self.admin_error(admin_id, "Message delivery failed").await;
            return;
        }

        // Relay if the client is live; a disconnected client just misses
        // the live push and reads it from the transcript later.
        self.registry
            .send_to_client(
                session_id,
                ClientEvent::Message {
                    content: content.to_string(),
                    sender_type: SenderKind::Agent,
                },
            )
            .await;
    }

    async fn handle_close(&self, admin_id: &str, session_id: &str) {
        match self.store.get_session(session_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.admin_error(admin_id, "Session not found").await;
                return;
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "session lookup failed");
                self.admin_error(admin_id, "Internal error").await;
                return;
            }
        }

        if let Err(err) = self.store.close_session(session_id).await {
            let message = match err {
                Error::SessionClosed(_) => "Session is already closed",
                _ => "Close failed",
            };
            tracing::error!(session_id = %session_id, admin_id = %admin_id, error = %err, "close write failed");
            self.admin_error(admin_id, message).await;
            return;
        }

        self.registry.unassign(session_id);
        let was_queued = self.queue.remove(session_id).is_some();
        TraceEvent::SessionClosed {
            session_id: session_id.to_string(),
            closed_by: admin_id.to_string(),
        }
        .emit();

        self.registry
            .send_to_client(
                session_id,
                ClientEvent::SessionClosed {
                    message: CLOSED_NOTICE.to_string(),
                },
            )
            .await;
        self.registry
            .close_client(session_id, 1000, "Session closed")
            .await;
        self.registry
            .send_to_admin(
                admin_id,
                AdminEvent::SessionClosed {
                    session_id: session_id.to_string(),
                },
            )
            .await;
        if was_queued {
            self.registry
                .broadcast_to_admins(
                    AdminEvent::QueueUpdate {
                        queue_size: self.queue.len(),
                        queued_sessions: self.queue.snapshot(),
                    },
                    None,
                )
                .await;
        }
    }

    async fn admin_error(&self, admin_id: &str, message: &str) {
        self.registry
            .send_to_admin(
                admin_id,
                AdminEvent::Error {
                    message: message.to_string(),
                },
            )
            .await;
    }
}
