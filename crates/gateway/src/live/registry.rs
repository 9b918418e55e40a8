//! In-memory registry of live client and admin connections.
//!
//! The registry is the only component holding transport handles (mpsc sinks
//! feeding each connection's writer task). It also keeps the session-to-admin
//! assignment map so the router can find the live agent for a session without
//! a store lookup. One lock per map; sinks are cloned out before any await so
//! no lock is ever held across a send.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use sb_protocol::{AdminEvent, ClientEvent};
use tokio::sync::mpsc;

/// A message the gateway can push to a connected client's WebSocket.
#[derive(Debug, Clone)]
pub enum ClientPush {
    Event(ClientEvent),
    /// Tell the writer task to send a close frame and stop.
    Close { code: u16, reason: String },
}

pub type ClientSink = mpsc::Sender<ClientPush>;
pub type AdminSink = mpsc::Sender<AdminEvent>;

/// Thread-safe registry of all live connections and assignments.
pub struct ConnectionRegistry {
    /// session_id -> sink of the session's client connection.
    clients: RwLock<HashMap<String, ClientSink>>,
    /// admin_id -> sink of the admin's connection.
    admins: RwLock<HashMap<String, AdminSink>>,
    /// session_id -> admin_id that has claimed it.
    assignments: RwLock<HashMap<String, String>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            admins: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Connection lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Register a client connection for a session. Replaces any existing
    /// sink for the same session (reconnect scenario); the stale connection
    /// cleans itself up through its own disconnect path.
    pub fn register_client(&self, session_id: &str, sink: ClientSink) {
        let replaced = self
            .clients
            .write()
            .insert(session_id.to_string(), sink)
            .is_some();
        tracing::info!(session_id = %session_id, replaced, "client registered");
    }

    /// Remove a client connection. Leaves any admin assignment in place so
    /// the conversation survives a client reconnect.
    pub fn unregister_client(&self, session_id: &str) {
        if self.clients.write().remove(session_id).is_some() {
            tracing::info!(session_id = %session_id, "client unregistered");
        }
    }

    /// Register an admin connection. Replaces any existing sink for the
    /// same admin identifier.
    pub fn register_admin(&self, admin_id: &str, sink: AdminSink) {
        let replaced = self
            .admins
            .write()
            .insert(admin_id.to_string(), sink)
            .is_some();
        tracing::info!(admin_id = %admin_id, replaced, "admin registered");
    }

    /// Remove an admin connection and release every session assigned to it.
    /// Returns the ids of the released sessions.
    pub fn unregister_admin(&self, admin_id: &str) -> Vec<String> {
        if self.admins.write().remove(admin_id).is_some() {
            tracing::info!(admin_id = %admin_id, "admin unregistered");
        }
        let mut assignments = self.assignments.write();
        let mut released = Vec::new();
        assignments.retain(|session_id, assigned| {
            if assigned == admin_id {
                released.push(session_id.clone());
                false
            } else {
                true
            }
        });
        released
    }

    pub fn is_client_connected(&self, session_id: &str) -> bool {
        self.clients.read().contains_key(session_id)
    }

    pub fn is_admin_connected(&self, admin_id: &str) -> bool {
        self.admins.read().contains_key(admin_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn admin_count(&self) -> usize {
        self.admins.read().len()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Assignments
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Atomically assign a session to an admin. Fails if the session is
    /// already assigned, so concurrent claims resolve to a single winner.
    pub fn try_assign(&self, session_id: &str, admin_id: &str) -> bool {
        match self.assignments.write().entry(session_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(admin_id.to_string());
                true
            }
        }
    }

    /// Drop a session's assignment. Returns the admin that held it.
    pub fn unassign(&self, session_id: &str) -> Option<String> {
        self.assignments.write().remove(session_id)
    }

    pub fn assigned_admin(&self, session_id: &str) -> Option<String> {
        self.assignments.read().get(session_id).cloned()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Outbound delivery
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Push an event to a session's client. Returns `false` if the client is
    /// not connected or its sink is dead; a dead sink is dropped from the
    /// registry on the spot.
    pub async fn send_to_client(&self, session_id: &str, event: ClientEvent) -> bool {
        self.push_to_client(session_id, ClientPush::Event(event))
            .await
    }

    /// Ask a session's client connection to close with the given code, then
    /// drop the registration. The writer task drains the buffered close
    /// frame before its channel ends.
    pub async fn close_client(&self, session_id: &str, code: u16, reason: &str) -> bool {
        let pushed = self
            .push_to_client(
                session_id,
                ClientPush::Close {
                    code,
                    reason: reason.to_string(),
                },
            )
            .await;
        self.clients.write().remove(session_id);
        pushed
    }

    async fn push_to_client(&self, session_id: &str, push: ClientPush) -> bool {
        let sink = self.clients.read().get(session_id).cloned();
        let Some(sink) = sink else {
            tracing::debug!(session_id = %session_id, "push to disconnected client skipped");
            return false;
        };
        if sink.send(push).await.is_err() {
            tracing::warn!(session_id = %session_id, "client sink closed, dropping connection");
            self.clients.write().remove(session_id);
            return false;
        }
        true
    }

    /// Push an event to one admin. Returns `false` if the admin is not
    /// connected or its sink is dead.
    pub async fn send_to_admin(&self, admin_id: &str, event: AdminEvent) -> bool {
        let sink = self.admins.read().get(admin_id).cloned();
        let Some(sink) = sink else {
            tracing::debug!(admin_id = %admin_id, "push to disconnected admin skipped");
            return false;
        };
        if sink.send(event).await.is_err() {
            tracing::warn!(admin_id = %admin_id, "admin sink closed, dropping connection");
            self.admins.write().remove(admin_id);
            return false;
        }
        true
    }

    /// Push an event to every connected admin, optionally skipping one.
    /// A dead sink drops that admin from the registry without affecting
    /// delivery to the rest.
    pub async fn broadcast_to_admins(&self, event: AdminEvent, exclude: Option<&str>) {
        let sinks: Vec<(String, AdminSink)> = self
            .admins
            .read()
            .iter()
            .filter(|(admin_id, _)| exclude != Some(admin_id.as_str()))
            .map(|(admin_id, sink)| (admin_id.clone(), sink.clone()))
            .collect();

        for (admin_id, sink) in sinks {
            if sink.send(event.clone()).await.is_err() {
                tracing::warn!(admin_id = %admin_id, "admin sink closed, dropping from broadcast");
                self.admins.write().remove(&admin_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_client_replaces_duplicate() {
        let reg = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        reg.register_client("s1", tx1);
        reg.register_client("s1", tx2);
        assert_eq!(reg.client_count(), 1);

        assert!(
            reg.send_to_client(
                "s1",
                ClientEvent::Waiting {
                    message: "hold".into()
                }
            )
            .await
        );
        // Only the newest sink receives.
        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_missing_client_returns_false() {
        let reg = ConnectionRegistry::new();
        assert!(
            !reg.send_to_client(
                "nope",
                ClientEvent::Waiting {
                    message: "hold".into()
                }
            )
            .await
        );
    }

    #[tokio::test]
    async fn close_client_delivers_then_unregisters() {
        let reg = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        reg.register_client("s1", tx);

        assert!(reg.close_client("s1", 1000, "Session closed").await);
        assert!(!reg.is_client_connected("s1"));
        match rx.recv().await {
            Some(ClientPush::Close { code, reason }) => {
                assert_eq!(code, 1000);
                assert_eq!(reason, "Session closed");
            }
            other => panic!("expected close push, got {other:?}"),
        }
        // Registration gone, channel drained: nothing further arrives.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dead_client_sink_is_dropped() {
        let reg = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        reg.register_client("s1", tx);

        assert!(
            !reg.send_to_client(
                "s1",
                ClientEvent::Waiting {
                    message: "hold".into()
                }
            )
            .await
        );
        assert!(!reg.is_client_connected("s1"));
    }

    #[test]
    fn try_assign_is_first_writer_wins() {
        let reg = ConnectionRegistry::new();
        assert!(reg.try_assign("s1", "alice"));
        assert!(!reg.try_assign("s1", "bob"));
        assert_eq!(reg.assigned_admin("s1").as_deref(), Some("alice"));
    }

    #[test]
    fn unregister_admin_releases_assignments() {
        let reg = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        reg.register_admin("alice", tx);
        reg.try_assign("s1", "alice");
        reg.try_assign("s2", "alice");
        reg.try_assign("s3", "bob");

        let mut released = reg.unregister_admin("alice");
        released.sort();
        assert_eq!(released, vec!["s1".to_string(), "s2".to_string()]);
        assert!(reg.assigned_admin("s1").is_none());
        assert_eq!(reg.assigned_admin("s3").as_deref(), Some("bob"));
    }

    #[test]
    fn unregister_client_keeps_assignment() {
        let reg = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        reg.register_client("s1", tx);
        reg.try_assign("s1", "alice");

        reg.unregister_client("s1");
        assert!(!reg.is_client_connected("s1"));
        assert_eq!(reg.assigned_admin("s1").as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn broadcast_skips_excluded_and_survives_dead_sink() {
        let reg = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        let (tx_c, mut rx_c) = mpsc::channel(4);
        reg.register_admin("alice", tx_a);
        reg.register_admin("bob", tx_b);
        reg.register_admin("carol", tx_c);
        drop(rx_b);

        reg.broadcast_to_admins(
            AdminEvent::QueueUpdate {
                queue_size: 0,
                queued_sessions: vec![],
            },
            Some("carol"),
        )
        .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
        assert!(!reg.is_admin_connected("bob"));
        assert!(reg.is_admin_connected("alice"));
        assert_eq!(reg.admin_count(), 2);
    }
}
