//! JSON-file implementation of [`ChatStore`].
//!
//! All sessions and transcripts live in one file. Mutations are serialized
//! through an async mutex: each one is applied to a scratch copy, written to
//! disk, and only then swapped into memory, so a failed write never leaves a
//! transition applied in memory but missing on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use sb_domain::error::{Error, Result};
use sb_domain::types::{ClientInfo, MessageRecord, SenderKind, SessionRecord, SessionState};

use crate::ChatStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State file shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    record: SessionRecord,
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StateFile {
    sessions: HashMap<String, StoredSession>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Chat store backed by a single JSON file.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StateFile>,
}

impl FileStore {
    /// Load or create the store at `path`. Parent directories are created.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(Error::Io)?;
            }
        }

        let state = if path.exists() {
            let raw = tokio::fs::read_to_string(path).await.map_err(Error::Io)?;
            match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable state file, starting fresh");
                    StateFile::default()
                }
            }
        } else {
            StateFile::default()
        };

        tracing::info!(
            sessions = state.sessions.len(),
            path = %path.display(),
            "chat store loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    /// Apply `f` to a scratch copy, persist it, then swap it in. The durable
    /// write happens before the in-memory state changes.
    async fn commit<T>(&self, f: impl FnOnce(&mut StateFile) -> Result<T>) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        let json = serde_json::to_string_pretty(&next)?;
        tokio::fs::write(&self.path, json).await.map_err(Error::Io)?;
        *guard = next;
        Ok(out)
    }
}

fn session_mut<'a>(state: &'a mut StateFile, session_id: &str) -> Result<&'a mut StoredSession> {
    state
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
}

fn apply_close(stored: &mut StoredSession) {
    let now = Utc::now();
    stored.record.state = SessionState::Closed;
    stored.record.assigned_admin = None;
    stored.record.closed_at = Some(now);
    stored.record.updated_at = now;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl ChatStore for FileStore {
    async fn create_session(&self, client: ClientInfo) -> Result<SessionRecord> {
        self.commit(|state| {
            let record = SessionRecord::new(client);
            state.sessions.insert(
                record.session_id.clone(),
                StoredSession {
                    record: record.clone(),
                    messages: Vec::new(),
                },
            );
            Ok(record)
        })
        .await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let guard = self.state.lock().await;
        Ok(guard.sessions.get(session_id).map(|s| s.record.clone()))
    }

    async fn create_message(
        &self,
        session_id: &str,
        sender: SenderKind,
        content: &str,
    ) -> Result<()> {
        self.commit(|state| {
            let stored = session_mut(state, session_id)?;
            stored.messages.push(MessageRecord::new(sender, content));
            if stored.record.state != SessionState::Closed {
                stored.record.updated_at = Utc::now();
            }
            Ok(())
        })
        .await
    }

    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        let guard = self.state.lock().await;
        let stored = guard
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let start = stored.messages.len().saturating_sub(limit);
        Ok(stored.messages[start..].to_vec())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let guard = self.state.lock().await;
        let stored = guard
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        Ok(stored.messages.clone())
    }

    async fn set_session_state(&self, session_id: &str, state: SessionState) -> Result<()> {
        self.commit(|file| {
            let stored = session_mut(file, session_id)?;
            if stored.record.state == SessionState::Closed {
                return Err(Error::SessionClosed(session_id.to_string()));
            }
            if state == SessionState::Closed {
                apply_close(stored);
            } else {
                stored.record.state = state;
                stored.record.updated_at = Utc::now();
            }
            Ok(())
        })
        .await
    }

    async fn assign_admin(&self, session_id: &str, admin_id: &str) -> Result<()> {
        self.commit(|state| {
            let stored = session_mut(state, session_id)?;
            if stored.record.state == SessionState::Closed {
                return Err(Error::SessionClosed(session_id.to_string()));
            }
            stored.record.state = SessionState::Human;
            stored.record.assigned_admin = Some(admin_id.to_string());
            stored.record.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn clear_admin(&self, session_id: &str) -> Result<()> {
        self.commit(|state| {
            let stored = session_mut(state, session_id)?;
            if stored.record.state == SessionState::Closed {
                return Ok(());
            }
            stored.record.assigned_admin = None;
            stored.record.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn close_session(&self, session_id: &str) -> Result<()> {
        self.commit(|state| {
            let stored = session_mut(state, session_id)?;
            if stored.record.state == SessionState::Closed {
                return Err(Error::SessionClosed(session_id.to_string()));
            }
            apply_close(stored);
            Ok(())
        })
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientInfo {
        ClientInfo {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> FileStore {
        FileStore::open(&dir.path().join("sessions.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let rec = store.create_session(client()).await.unwrap();
        let fetched = store.get_session(&rec.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.session_id, rec.session_id);
        assert_eq!(fetched.state, SessionState::Automated);
    }

    #[tokio::test]
    async fn message_on_unknown_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let err = store
            .create_message("nope", SenderKind::Client, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn history_returns_last_n_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let rec = store.create_session(client()).await.unwrap();

        for i in 0..5 {
            store
                .create_message(&rec.session_id, SenderKind::Client, &format!("m{i}"))
                .await
                .unwrap();
        }

        let hist = store.history(&rec.session_id, 3).await.unwrap();
        let contents: Vec<_> = hist.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn close_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let rec = store.create_session(client()).await.unwrap();

        store.assign_admin(&rec.session_id, "a1").await.unwrap();
        store.close_session(&rec.session_id).await.unwrap();

        let closed = store.get_session(&rec.session_id).await.unwrap().unwrap();
        assert_eq!(closed.state, SessionState::Closed);
        assert!(closed.assigned_admin.is_none());
        assert!(closed.closed_at.is_some());

        let err = store
            .set_session_state(&rec.session_id, SessionState::Human)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));

        let err = store.close_session(&rec.session_id).await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));

        let err = store.assign_admin(&rec.session_id, "a2").await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));
    }

    #[tokio::test]
    async fn clear_admin_keeps_session_human() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let rec = store.create_session(client()).await.unwrap();

        store.assign_admin(&rec.session_id, "a1").await.unwrap();
        store.clear_admin(&rec.session_id).await.unwrap();

        let fetched = store.get_session(&rec.session_id).await.unwrap().unwrap();
        assert_eq!(fetched.state, SessionState::Human);
        assert!(fetched.assigned_admin.is_none());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = {
            let store = open_store(&dir).await;
            let rec = store.create_session(client()).await.unwrap();
            store
                .create_message(&rec.session_id, SenderKind::Assistant, "hello")
                .await
                .unwrap();
            rec.session_id
        };

        let store = open_store(&dir).await;
        let fetched = store.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(fetched.client.name, "Ada");
        let msgs = store.messages(&session_id).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender, SenderKind::Assistant);
    }
}
