//! Revision feed for observing committed table changes.
//!
//! Every commit emits one [`RevisionEvent`] per table it bumped. Downstream
//! consumers (dataplane programmers) use the feed to learn that a new
//! consistent snapshot exists and then read it with
//! [`Store::snapshot`](crate::Store::snapshot), instead of rescanning on
//! every micro-write.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = Store::new();
//! let receiver = store.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(event) = receiver.recv() {
//!         println!("{} is now at {}", event.table, event.revision);
//!     }
//! });
//! ```

use crate::types::{Revision, SequenceNumber, Table};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// A table reached a new revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEvent {
    /// Sequence of the commit that produced the revision.
    pub sequence: SequenceNumber,
    /// Table that changed.
    pub table: Table,
    /// New revision of the table.
    pub revision: Revision,
}

/// Distributes revision events to subscribers.
///
/// The feed:
/// - Emits only committed revisions
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Keeps a bounded history for polling
pub struct RevisionFeed {
    /// Subscribers (senders).
    subscribers: RwLock<Vec<Sender<RevisionEvent>>>,
    /// History of recent events for polling.
    history: RwLock<Vec<RevisionEvent>>,
    /// Maximum history size.
    max_history: usize,
}

impl RevisionFeed {
    /// Default number of events kept for polling.
    pub const DEFAULT_MAX_HISTORY: usize = 10_000;

    /// Creates a new revision feed.
    pub fn new() -> Self {
        Self::with_max_history(Self::DEFAULT_MAX_HISTORY)
    }

    /// Creates a revision feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that will receive all future revision events.
    ///
    /// The channel is unbounded: events queue up until the receiver drains
    /// them, so a live receiver that is never read grows without limit.
    /// Drop the receiver to unsubscribe, or use [`poll`](Self::poll), which
    /// only keeps the bounded history.
    pub fn subscribe(&self) -> Receiver<RevisionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits the events of a single commit.
    pub fn emit_batch(&self, events: &[RevisionEvent]) {
        if events.is_empty() {
            return;
        }

        {
            let mut history = self.history.write();
            history.extend_from_slice(events);
            if history.len() > self.max_history {
                let to_remove = history.len() - self.max_history;
                history.drain(0..to_remove);
            }
        }

        // Send to subscribers (remove disconnected ones)
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| events.iter().all(|event| tx.send(*event).is_ok()));
    }

    /// Polls events committed after `cursor`, up to `limit`.
    pub fn poll(&self, cursor: SequenceNumber, limit: usize) -> Vec<RevisionEvent> {
        let history = self.history.read();
        history
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .copied()
            .collect()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for RevisionFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RevisionFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history_len", &self.history_len())
            .field("max_history", &self.max_history)
            .finish()
    }
}
