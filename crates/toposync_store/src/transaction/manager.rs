//! Transaction manager.

use crate::error::{StoreError, StoreResult};
use crate::feed::{RevisionEvent, RevisionFeed};
use crate::snapshot::{Snapshot, TableMap};
use crate::transaction::state::{PendingWrite, Transaction, WriteTransaction};
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Manages write transactions and the committed snapshot.
///
/// The transaction manager provides:
/// - Single-writer concurrency control via `begin_write()`
/// - Copy-on-write snapshots for readers
/// - Per-table revision bumps on commit
/// - Commit ordering via sequence numbers
///
/// ## Single-Writer Guarantee
///
/// Only one write transaction can be active at a time. `begin_write()`
/// acquires an exclusive lock that is held for the transaction's lifetime.
pub struct TransactionManager {
    /// Latest committed snapshot.
    committed: RwLock<Arc<Snapshot>>,
    /// Next transaction ID.
    next_txid: AtomicU64,
    /// Write lock - only one writer at a time.
    write_lock: Mutex<()>,
    /// Revision feed.
    feed: Arc<RevisionFeed>,
}

impl TransactionManager {
    /// Creates a new transaction manager over an empty store.
    pub fn new(feed: Arc<RevisionFeed>) -> Self {
        Self {
            committed: RwLock::new(Arc::new(Snapshot::default())),
            next_txid: AtomicU64::new(1),
            write_lock: Mutex::new(()),
            feed,
        }
    }

    /// Begins a new write transaction with exclusive write lock.
    ///
    /// Blocks while another write transaction is open. The lock is released
    /// when the returned transaction is dropped.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        let guard = self.write_lock.lock();
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let base = self.snapshot();
        tracing::trace!(txn = %txid, base = %base.sequence(), "begin write transaction");
        WriteTransaction::new(Transaction::new(txid, base), guard)
    }

    /// Commits a write transaction.
    ///
    /// All staged writes are applied to a copy of the base snapshot, every
    /// touched table gets exactly one revision bump, and the new snapshot is
    /// published in a single swap. Only tables with staged writes are copied;
    /// the others are shared with the base. Returns the commit sequence.
    pub fn commit_write(&self, wtxn: &mut WriteTransaction<'_>) -> StoreResult<SequenceNumber> {
        let txn = wtxn.inner_mut();
        txn.ensure_active()
            .map_err(|_| StoreError::invalid_operation("transaction not active"))?;

        let mut next = Snapshot::clone(txn.base());
        let sequence = next.sequence.next();
        next.sequence = sequence;

        let writes = txn.writes();
        apply(&mut next.services, &writes.services);
        apply(&mut next.endpoints, &writes.endpoints);
        apply(&mut next.nodes, &writes.nodes);

        let mut events = Vec::new();
        for table in txn.touched_tables() {
            let revision = next.revision(table).next();
            next.revisions.insert(table, revision);
            events.push(RevisionEvent {
                sequence,
                table,
                revision,
            });
        }
        next.synced.extend(txn.synced_tables().iter().copied());

        *self.committed.write() = Arc::new(next);
        txn.mark_committed();

        tracing::debug!(
            txn = %txn.id(),
            seq = %sequence,
            writes = txn.write_count(),
            bumped = events.len(),
            "committed write transaction"
        );

        self.feed.emit_batch(&events);
        Ok(sequence)
    }

    /// Aborts a write transaction.
    ///
    /// All staged writes are discarded. The write lock is released when the
    /// transaction is dropped.
    pub fn abort_write(&self, wtxn: &mut WriteTransaction<'_>) -> StoreResult<()> {
        let txn = wtxn.inner_mut();
        if !txn.is_active() {
            return Err(StoreError::invalid_operation("transaction not active"));
        }
        txn.mark_aborted();
        tracing::debug!(txn = %txn.id(), "aborted write transaction");
        Ok(())
    }

    /// Returns the latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.committed.read())
    }

    /// Returns the current committed sequence number.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.committed.read().sequence()
    }
}

fn apply<K, V>(table: &mut TableMap<K, V>, writes: &BTreeMap<K, PendingWrite<V>>)
where
    K: Ord + Clone,
{
    if writes.is_empty() {
        return;
    }
    let table = Arc::make_mut(table);
    for (key, write) in writes {
        match write {
            PendingWrite::Put(value) => {
                table.insert(key.clone(), Arc::clone(value));
            }
            PendingWrite::Delete => {
                table.remove(key);
            }
        }
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}
