use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Who is currently responsible for answering a session.
///
/// `Closed` is terminal: once a session reaches it, no further state
/// transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// The automated responder answers client messages.
    Automated,
    /// A human agent answers (or the session is queued waiting for one).
    Human,
    /// The conversation has ended.
    Closed,
}

/// Originator of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Client,
    Assistant,
    Agent,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Contact details captured when the client opens a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A single chat session as tracked by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque, globally unique identifier (UUID v4), minted at creation
    /// and never changed.
    pub session_id: String,
    pub state: SessionState,
    pub client: ClientInfo,
    /// The admin who claimed this session. Set iff `state == Human` and
    /// an admin has actually claimed it — a queued session is `Human`
    /// with this unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_admin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Mint a fresh session in the `Automated` state.
    pub fn new(client: ClientInfo) -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            state: SessionState::Automated,
            client,
            assigned_admin: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }
}

/// One message in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: SenderKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(sender: SenderKind, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_automated_and_unassigned() {
        let rec = SessionRecord::new(ClientInfo {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        });
        assert_eq!(rec.state, SessionState::Automated);
        assert!(rec.assigned_admin.is_none());
        assert!(rec.closed_at.is_none());
        assert!(!rec.session_id.is_empty());
    }

    #[test]
    fn session_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionState::Automated).unwrap(),
            "\"automated\""
        );
        assert_eq!(
            serde_json::to_string(&SenderKind::Agent).unwrap(),
            "\"agent\""
        );
    }
}
