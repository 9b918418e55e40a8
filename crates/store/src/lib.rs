//! Session and transcript persistence for Switchboard.
//!
//! The routing engine only talks to the [`ChatStore`] trait; the shipped
//! implementation is [`FileStore`], a JSON file under the configured state
//! path. Every mutating call commits durably before returning — on a write
//! failure the in-memory state is left untouched and the caller sees the
//! error.

pub mod file;

pub use file::FileStore;

use sb_domain::error::Result;
use sb_domain::types::{ClientInfo, MessageRecord, SenderKind, SessionRecord, SessionState};

/// Durable storage contract consumed by the router and the REST API.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Mint and persist a fresh session in the `Automated` state.
    async fn create_session(&self, client: ClientInfo) -> Result<SessionRecord>;

    /// Look up a session record by id.
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Append a message to the session transcript.
    async fn create_message(
        &self,
        session_id: &str,
        sender: SenderKind,
        content: &str,
    ) -> Result<()>;

    /// The most recent `limit` transcript messages, oldest first.
    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<MessageRecord>>;

    /// The full transcript, oldest first.
    async fn messages(&self, session_id: &str) -> Result<Vec<MessageRecord>>;

    /// Change the session state. Setting [`SessionState::Closed`] behaves
    /// like [`ChatStore::close_session`]. Fails on closed sessions.
    async fn set_session_state(&self, session_id: &str, state: SessionState) -> Result<()>;

    /// Record that `admin_id` now owns the session. Fails on closed sessions.
    async fn assign_admin(&self, session_id: &str, admin_id: &str) -> Result<()>;

    /// Drop the owning admin, keeping the session in its current state.
    /// A no-op on closed sessions.
    async fn clear_admin(&self, session_id: &str) -> Result<()>;

    /// Mark the session closed, clear the owning admin, and stamp
    /// `closed_at`. Fails if the session is already closed.
    async fn close_session(&self, session_id: &str) -> Result<()>;
}
