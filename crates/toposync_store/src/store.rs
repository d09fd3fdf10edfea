//! Store facade.

use crate::error::{StoreError, StoreResult};
use crate::feed::{RevisionEvent, RevisionFeed};
use crate::snapshot::Snapshot;
use crate::transaction::{Transaction, TransactionManager, WriteTransaction};
use crate::types::{Revision, SequenceNumber, Table};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Configuration for a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of revision events kept for polling.
    pub max_feed_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_feed_history: RevisionFeed::DEFAULT_MAX_HISTORY,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of revision events kept for polling.
    #[must_use]
    pub const fn max_feed_history(mut self, value: usize) -> Self {
        self.max_feed_history = value;
        self
    }
}

/// The topology store.
///
/// All writes go through [`Store::update`] (or the lower-level
/// `begin_write`/`commit_write` pair). Readers take a [`Snapshot`], which
/// is a committed, immutable view of every table.
///
/// ```rust
/// use toposync_store::{EndpointRecord, Store, StoreError, Table};
///
/// let store = Store::new();
/// let events = store.subscribe();
///
/// store.update(|tx| {
///     tx.set_endpoint(EndpointRecord::new("default", "web", "a").on_node("n1"))?;
///     Ok::<_, StoreError>(())
/// })?;
///
/// let event = events.recv().unwrap();
/// assert_eq!(event.table, Table::Endpoints);
/// assert_eq!(store.revision(Table::Endpoints).as_u64(), 1);
/// # Ok::<_, StoreError>(())
/// ```
pub struct Store {
    txn_manager: TransactionManager,
    feed: Arc<RevisionFeed>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        let feed = Arc::new(RevisionFeed::with_max_history(config.max_feed_history));
        Self {
            txn_manager: TransactionManager::new(Arc::clone(&feed)),
            feed,
        }
    }

    /// Executes a function within a write transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is aborted, nothing it staged
    /// becomes visible, and the error is returned unchanged.
    ///
    /// Only one `update` runs at a time; concurrent callers block.
    pub fn update<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut wtxn = self.begin_write();
        match f(wtxn.inner_mut()) {
            Ok(result) => {
                self.commit_write(&mut wtxn)?;
                Ok(result)
            }
            Err(e) => {
                // Don't mask the original error
                let _ = self.abort_write(&mut wtxn);
                Err(e)
            }
        }
    }

    /// Begins a new write transaction with exclusive lock.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        self.txn_manager.begin_write()
    }

    /// Commits a write transaction.
    pub fn commit_write(&self, wtxn: &mut WriteTransaction<'_>) -> StoreResult<SequenceNumber> {
        self.txn_manager.commit_write(wtxn)
    }

    /// Aborts a write transaction.
    pub fn abort_write(&self, wtxn: &mut WriteTransaction<'_>) -> StoreResult<()> {
        self.txn_manager.abort_write(wtxn)
    }

    /// Returns the latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.txn_manager.snapshot()
    }

    /// Runs a read against the latest committed snapshot.
    pub fn view<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Snapshot) -> T,
    {
        f(&self.snapshot())
    }

    /// Returns the committed revision of a table.
    #[must_use]
    pub fn revision(&self, table: Table) -> Revision {
        self.snapshot().revision(table)
    }

    /// Returns the current committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.txn_manager.committed_seq()
    }

    /// Subscribes to revision events of future commits.
    ///
    /// Events queue in an unbounded channel until received. A subscriber
    /// that stops reading must drop its receiver, or its queue grows with
    /// every commit. Consumers that may fall behind should [`poll`](Self::poll)
    /// instead.
    pub fn subscribe(&self) -> Receiver<RevisionEvent> {
        self.feed.subscribe()
    }

    /// Polls revision events committed after `cursor`.
    pub fn poll(&self, cursor: SequenceNumber, limit: usize) -> Vec<RevisionEvent> {
        self.feed.poll(cursor, limit)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("txn_manager", &self.txn_manager)
            .field("feed", &self.feed)
            .finish()
    }
}
