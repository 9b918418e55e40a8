//! Wire protocol: WebSocket frame types exchanged with clients and admins.
//!
//! Clients connect per-session and exchange plain chat messages; admins
//! connect once and multiplex every session they handle over a single
//! socket, so admin frames carry the target `session_id`.

use chrono::{DateTime, Utc};
use sb_domain::types::{ClientInfo, SenderKind, SessionState};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Close codes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Close code sent when the session id in the connect URL is unknown.
pub const CLOSE_SESSION_NOT_FOUND: u16 = 4004;
/// Close code sent when the session exists but has already been closed.
pub const CLOSE_SESSION_CLOSED: u16 = 4003;
/// Close code sent when the admin credential is missing or wrong.
pub const CLOSE_UNAUTHORIZED: u16 = 4001;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Client → Gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// A chat message from the client.
    #[serde(rename = "message")]
    Message { content: String },
}

/// Admin → Gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminFrame {
    /// Take ownership of a queued session.
    #[serde(rename = "claim_session")]
    ClaimSession { session_id: String },

    /// A chat message for the client of `session_id`.
    #[serde(rename = "message")]
    Message { session_id: String, content: String },

    /// End a conversation.
    #[serde(rename = "close_session")]
    CloseSession { session_id: String },

    /// Ask for a fresh queue snapshot.
    #[serde(rename = "get_queue")]
    GetQueue,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One waiting session, as shown to admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub session_id: String,
    pub queued_at: DateTime<Utc>,
}

/// Gateway → Client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Sent once, immediately after the socket is accepted.
    #[serde(rename = "connected")]
    Connected {
        message: String,
        session_id: String,
        state: SessionState,
    },

    /// A reply from the automated responder or the connected agent.
    #[serde(rename = "message")]
    Message {
        content: String,
        sender_type: SenderKind,
    },

    /// Escalation acknowledged; the session is now waiting for an agent.
    #[serde(rename = "handoff_requested")]
    HandoffRequested {
        message: String,
        sender_type: SenderKind,
    },

    /// No agent is available right now; the session stays queued.
    #[serde(rename = "waiting")]
    Waiting { message: String },

    /// An agent claimed the session and will answer from here on.
    #[serde(rename = "agent_connected")]
    AgentConnected { message: String },

    /// The conversation was closed by an agent.
    #[serde(rename = "session_closed")]
    SessionClosed { message: String },
}

/// Gateway → Admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdminEvent {
    /// Sent once after authentication, with the current queue.
    #[serde(rename = "connected")]
    Connected {
        message: String,
        queue_size: usize,
        queued_sessions: Vec<QueueEntry>,
    },

    /// This admin now owns the session.
    #[serde(rename = "session_claimed")]
    SessionClaimed {
        session_id: String,
        client_info: ClientInfo,
    },

    /// Another admin claimed a session; the queue shrank.
    #[serde(rename = "session_claimed_by_other")]
    SessionClaimedByOther { session_id: String, queue_size: usize },

    /// A session entered the waiting queue.
    #[serde(rename = "new_session_queued")]
    NewSessionQueued {
        session_id: String,
        client_name: String,
        queue_size: usize,
    },

    /// Snapshot reply to `get_queue`.
    #[serde(rename = "queue_update")]
    QueueUpdate {
        queue_size: usize,
        queued_sessions: Vec<QueueEntry>,
    },

    /// An admin action failed; `message` is safe to display.
    #[serde(rename = "error")]
    Error { message: String },

    /// A client message relayed to the owning admin.
    #[serde(rename = "message")]
    Message {
        session_id: String,
        content: String,
        sender_type: SenderKind,
        client_name: String,
    },

    /// Confirmation that a close took effect.
    #[serde(rename = "session_closed")]
    SessionClosed { session_id: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_parses_message() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"message","content":"hi there"}"#).unwrap();
        let ClientFrame::Message { content } = frame;
        assert_eq!(content, "hi there");
    }

    #[test]
    fn admin_frame_parses_claim() {
        let frame: AdminFrame =
            serde_json::from_str(r#"{"type":"claim_session","session_id":"s1"}"#).unwrap();
        assert!(matches!(frame, AdminFrame::ClaimSession { session_id } if session_id == "s1"));
    }

    #[test]
    fn admin_frame_parses_get_queue_without_fields() {
        let frame: AdminFrame = serde_json::from_str(r#"{"type":"get_queue"}"#).unwrap();
        assert!(matches!(frame, AdminFrame::GetQueue));
    }

    #[test]
    fn unknown_frame_type_is_a_parse_error() {
        let res = serde_json::from_str::<AdminFrame>(r#"{"type":"reboot"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn unrecognized_fields_are_tolerated() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"message","content":"x","ts":123}"#).unwrap();
        let ClientFrame::Message { content } = frame;
        assert_eq!(content, "x");
    }

    #[test]
    fn client_event_wire_shape() {
        let ev = ClientEvent::Message {
            content: "hello".into(),
            sender_type: SenderKind::Assistant,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["sender_type"], "assistant");
    }

    #[test]
    fn admin_event_wire_shape() {
        let ev = AdminEvent::NewSessionQueued {
            session_id: "s1".into(),
            client_name: "Ada".into(),
            queue_size: 1,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(json["type"], "new_session_queued");
        assert_eq!(json["queue_size"], 1);
    }
}
