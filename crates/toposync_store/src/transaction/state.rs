//! Transaction state.

use crate::error::{StoreError, StoreResult};
use crate::record::{EndpointKey, EndpointRecord, Kv, NodeRecord, ServiceKey, ServiceRecord};
use crate::snapshot::Snapshot;
use crate::types::{Table, TransactionId};
use parking_lot::MutexGuard;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// Represents a pending write in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite<V> {
    /// Insert or replace a record.
    Put(Arc<V>),
    /// Delete a record.
    Delete,
}

impl<V> PendingWrite<V> {
    /// Returns the staged value, `None` for a delete.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match self {
            PendingWrite::Put(v) => Some(v),
            PendingWrite::Delete => None,
        }
    }
}

/// Staged writes, per table.
#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    pub(crate) services: BTreeMap<ServiceKey, PendingWrite<ServiceRecord>>,
    pub(crate) endpoints: BTreeMap<EndpointKey, PendingWrite<EndpointRecord>>,
    pub(crate) nodes: BTreeMap<String, PendingWrite<NodeRecord>>,
}

impl PendingWrites {
    fn len(&self) -> usize {
        self.services.len() + self.endpoints.len() + self.nodes.len()
    }
}

/// An active transaction.
///
/// Writes are staged and only become visible to other readers when the
/// transaction commits. Reads inside the transaction see its own staged
/// writes layered over the snapshot it started from.
#[derive(Debug)]
pub struct Transaction {
    /// Transaction ID.
    id: TransactionId,
    /// Committed snapshot this transaction started from.
    base: Arc<Snapshot>,
    /// Current state.
    state: TransactionState,
    /// Staged writes.
    writes: PendingWrites,
    /// Tables whose revision is bumped on commit.
    touched: BTreeSet<Table>,
    /// Tables flagged as synced on commit.
    synced: BTreeSet<Table>,
}

impl Transaction {
    /// Creates a new transaction over a committed snapshot.
    pub(crate) fn new(id: TransactionId, base: Arc<Snapshot>) -> Self {
        Self {
            id,
            base,
            state: TransactionState::Active,
            writes: PendingWrites::default(),
            touched: BTreeSet::new(),
            synced: BTreeSet::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Stages an upsert of a node, keyed by name.
    pub fn set_node(&mut self, node: NodeRecord) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .nodes
            .insert(node.name.clone(), PendingWrite::Put(Arc::new(node)));
        self.touched.insert(Table::Nodes);
        Ok(())
    }

    /// Stages the removal of a node. Removing an absent node is not an error.
    pub fn del_node(&mut self, name: &str) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .nodes
            .insert(name.to_string(), PendingWrite::Delete);
        self.touched.insert(Table::Nodes);
        Ok(())
    }

    /// Gets a node as seen by this transaction.
    #[must_use]
    pub fn get_node(&self, name: &str) -> Option<&NodeRecord> {
        match self.writes.nodes.get(name) {
            Some(write) => write.value(),
            None => self.base.node(name),
        }
    }

    /// Stages an upsert of an endpoint, keyed by its identity.
    pub fn set_endpoint(&mut self, endpoint: EndpointRecord) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .endpoints
            .insert(endpoint.id(), PendingWrite::Put(Arc::new(endpoint)));
        self.touched.insert(Table::Endpoints);
        Ok(())
    }

    /// Stages the removal of an endpoint.
    pub fn del_endpoint(&mut self, key: &EndpointKey) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .endpoints
            .insert(key.clone(), PendingWrite::Delete);
        self.touched.insert(Table::Endpoints);
        Ok(())
    }

    /// Gets an endpoint as seen by this transaction.
    #[must_use]
    pub fn get_endpoint(&self, key: &EndpointKey) -> Option<&EndpointRecord> {
        match self.writes.endpoints.get(key) {
            Some(write) => write.value(),
            None => self.base.endpoint(key),
        }
    }

    /// Stages an upsert of a service, keyed by its identity.
    pub fn set_service(&mut self, service: ServiceRecord) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .services
            .insert(service.id(), PendingWrite::Put(Arc::new(service)));
        self.touched.insert(Table::Services);
        Ok(())
    }

    /// Stages the removal of a service.
    pub fn del_service(&mut self, key: &ServiceKey) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .services
            .insert(key.clone(), PendingWrite::Delete);
        self.touched.insert(Table::Services);
        Ok(())
    }

    /// Gets a service as seen by this transaction.
    #[must_use]
    pub fn get_service(&self, key: &ServiceKey) -> Option<&ServiceRecord> {
        match self.writes.services.get(key) {
            Some(write) => write.value(),
            None => self.base.service(key),
        }
    }

    /// Enumerates a table as seen by this transaction, in key order.
    ///
    /// The visitor receives shared borrows, so nothing can be written while
    /// the enumeration is open: collect what must change and apply it after
    /// `each` returns. Returns `Ok(false)` if the visitor stopped early.
    pub fn each<F>(&self, table: Table, mut visit: F) -> StoreResult<bool>
    where
        F: FnMut(Kv<'_>) -> bool,
    {
        self.ensure_active()?;
        let completed = match table {
            Table::Services => each_merged(&*self.base.services, &self.writes.services, |s| {
                visit(Kv::Service(s))
            }),
            Table::Endpoints => {
                each_merged(&*self.base.endpoints, &self.writes.endpoints, |e| {
                    visit(Kv::Endpoint(e))
                })
            }
            Table::Nodes => {
                each_merged(&*self.base.nodes, &self.writes.nodes, |n| visit(Kv::Node(n)))
            }
        };
        Ok(completed)
    }

    /// Requests a revision bump for a table on commit.
    ///
    /// Writes already bump the tables they touch; a table is bumped at most
    /// once per commit however many times it is written or notified.
    pub fn bump(&mut self, table: Table) -> StoreResult<()> {
        self.ensure_active()?;
        self.touched.insert(table);
        Ok(())
    }

    /// Flags a table as having received its initial full listing.
    pub fn set_sync(&mut self, table: Table) -> StoreResult<()> {
        self.ensure_active()?;
        self.synced.insert(table);
        Ok(())
    }

    /// Checks whether a table is synced, counting flags staged here.
    #[must_use]
    pub fn is_synced(&self, table: Table) -> bool {
        self.synced.contains(&table) || self.base.is_synced(table)
    }

    /// Returns the number of staged writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Returns the tables whose revision will be bumped on commit.
    pub fn touched_tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.touched.iter().copied()
    }

    pub(crate) fn base(&self) -> &Arc<Snapshot> {
        &self.base
    }

    pub(crate) fn writes(&self) -> &PendingWrites {
        &self.writes
    }

    pub(crate) fn synced_tables(&self) -> &BTreeSet<Table> {
        &self.synced
    }

    /// Marks the transaction as committed.
    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    /// Marks the transaction as aborted.
    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
    }

    /// Ensures the transaction is active.
    pub(crate) fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(StoreError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(StoreError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

/// Visits `base` overlaid with `pending` in key order.
fn each_merged<K, V, F>(
    base: &BTreeMap<K, Arc<V>>,
    pending: &BTreeMap<K, PendingWrite<V>>,
    mut visit: F,
) -> bool
where
    K: Ord,
    F: FnMut(&V) -> bool,
{
    let mut base_iter = base.iter().peekable();
    let mut pending_iter = pending.iter().peekable();

    loop {
        let step = match (base_iter.peek(), pending_iter.peek()) {
            (None, None) => return true,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((base_key, _)), Some((pending_key, _))) => base_key.cmp(pending_key),
        };

        let current = match step {
            Ordering::Less => base_iter.next().map(|(_, v)| v.as_ref()),
            Ordering::Greater => pending_iter.next().and_then(|(_, w)| w.value()),
            Ordering::Equal => {
                base_iter.next();
                pending_iter.next().and_then(|(_, w)| w.value())
            }
        };

        if let Some(value) = current {
            if !visit(value) {
                return false;
            }
        }
    }
}

/// A transaction holding the store's exclusive write lock.
///
/// The lock is released when this value is dropped. A write transaction
/// dropped while still active is aborted: none of its writes are applied.
pub struct WriteTransaction<'a> {
    txn: Transaction,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(txn: Transaction, guard: MutexGuard<'a, ()>) -> Self {
        Self { txn, _guard: guard }
    }

    /// Returns the underlying transaction.
    pub fn inner_mut(&mut self) -> &mut Transaction {
        &mut self.txn
    }
}

impl Deref for WriteTransaction<'_> {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.txn
    }
}

impl DerefMut for WriteTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.txn
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.txn.is_active() {
            tracing::debug!(txn = %self.txn.id(), "dropping active write transaction");
            self.txn.mark_aborted();
        }
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("txn", &self.txn)
            .finish_non_exhaustive()
    }
}
