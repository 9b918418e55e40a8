//! FIFO queue of sessions waiting for a human agent.
//!
//! Backed by a `VecDeque` for ordering plus a sequence-number index for O(1)
//! membership tests and removal. Removing by id only drops the index entry;
//! the deque slot becomes a tombstone that `pop_next` skips. A session that
//! is removed and enqueued again goes to the tail with a fresh sequence
//! number, so stale tombstones can never shadow a live entry.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sb_protocol::QueueEntry;

struct QueueItem {
    seq: u64,
    session_id: String,
    queued_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueInner {
    items: VecDeque<QueueItem>,
    /// session_id -> seq of its live entry. Absent means not queued.
    index: HashMap<String, u64>,
    next_seq: u64,
}

/// Thread-safe FIFO of waiting sessions with O(1) contains/remove.
pub struct WaitingQueue {
    inner: Mutex<QueueInner>,
}

impl Default for WaitingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
        }
    }

    /// Add a session to the tail of the queue. Returns `false` without
    /// changing anything if the session is already queued.
    pub fn enqueue(&self, session_id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.index.contains_key(session_id) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index.insert(session_id.to_string(), seq);
        inner.items.push_back(QueueItem {
            seq,
            session_id: session_id.to_string(),
            queued_at: Utc::now(),
        });
        tracing::debug!(session_id = %session_id, queue_len = inner.index.len(), "session enqueued");
        true
    }

    /// Pop the oldest waiting session, skipping entries removed by id.
    pub fn pop_next(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        while let Some(item) = inner.items.pop_front() {
            let live = inner.index.get(&item.session_id).copied();
            match live {
                Some(seq) if seq == item.seq => {
                    inner.index.remove(&item.session_id);
                    return Some(item.session_id);
                }
                // Tombstone: removed or re-enqueued under a newer seq.
                _ => continue,
            }
        }
        None
    }

    /// Remove a session from the queue wherever it sits. Returns the time it
    /// was enqueued, or `None` if it was not queued.
    pub fn remove(&self, session_id: &str) -> Option<DateTime<Utc>> {
        let mut inner = self.inner.lock();
        let seq = inner.index.remove(session_id)?;
        inner
            .items
            .iter()
            .find(|item| item.seq == seq)
            .map(|item| item.queued_at)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().index.contains_key(session_id)
    }

    /// Number of live (non-tombstone) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().index.is_empty()
    }

    /// Live entries in FIFO order, oldest first.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        let inner = self.inner.lock();
        inner
            .items
            .iter()
            .filter(|item| inner.index.get(&item.session_id) == Some(&item.seq))
            .map(|item| QueueEntry {
                session_id: item.session_id.clone(),
                queued_at: item.queued_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let q = WaitingQueue::new();
        assert!(q.enqueue("a"));
        assert!(q.enqueue("b"));
        assert!(q.enqueue("c"));
        assert_eq!(q.len(), 3);

        assert_eq!(q.pop_next().as_deref(), Some("a"));
        assert_eq!(q.pop_next().as_deref(), Some("b"));
        assert_eq!(q.pop_next().as_deref(), Some("c"));
        assert_eq!(q.pop_next(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn enqueue_is_idempotent() {
        let q = WaitingQueue::new();
        assert!(q.enqueue("a"));
        assert!(!q.enqueue("a"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.snapshot().len(), 1);
    }

    #[test]
    fn remove_mid_queue_keeps_order() {
        let q = WaitingQueue::new();
        q.enqueue("a");
        q.enqueue("b");
        q.enqueue("c");

        assert!(q.remove("b").is_some());
        assert!(!q.contains("b"));
        assert_eq!(q.len(), 2);

        assert_eq!(q.pop_next().as_deref(), Some("a"));
        assert_eq!(q.pop_next().as_deref(), Some("c"));
        assert_eq!(q.pop_next(), None);
    }

    #[test]
    fn remove_absent_returns_none() {
        let q = WaitingQueue::new();
        q.enqueue("a");
        assert!(q.remove("zzz").is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn reenqueue_after_remove_goes_to_tail() {
        let q = WaitingQueue::new();
        q.enqueue("a");
        q.enqueue("b");
        q.remove("a");
        assert!(q.enqueue("a"));

        // "a" lost its original slot: "b" now pops first.
        assert_eq!(q.pop_next().as_deref(), Some("b"));
        assert_eq!(q.pop_next().as_deref(), Some("a"));
    }

    #[test]
    fn snapshot_skips_tombstones() {
        let q = WaitingQueue::new();
        q.enqueue("a");
        q.enqueue("b");
        q.enqueue("c");
        q.remove("b");

        let snap = q.snapshot();
        let ids: Vec<&str> = snap.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn remove_returns_enqueue_time() {
        let q = WaitingQueue::new();
        let before = Utc::now();
        q.enqueue("a");
        let after = Utc::now();

        let queued_at = q.remove("a").unwrap();
        assert!(queued_at >= before && queued_at <= after);
    }
}
