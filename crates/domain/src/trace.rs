use serde::Serialize;

/// Structured trace events emitted across all Switchboard crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
        client_name: String,
    },
    HandoffDetected {
        session_id: String,
        phrase: String,
    },
    SessionQueued {
        session_id: String,
        queue_len: usize,
    },
    SessionClaimed {
        session_id: String,
        admin_id: String,
        wait_ms: u64,
    },
    SessionClosed {
        session_id: String,
        closed_by: String,
    },
    AdminVanished {
        admin_id: String,
        sessions_affected: usize,
    },
    ResponderReply {
        session_id: String,
        duration_ms: u64,
        fallback: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sb_event");
    }
}
