//! Shared handler plumbing: transactions, sync notification, dispatch.

use crate::error::CoreResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use toposync_store::{Store, StoreResult, Table, Transaction};

/// Handles lifecycle notifications for one upstream object kind.
pub trait ResourceHandler {
    /// Object type consumed by this handler.
    type Object;

    /// Object was added.
    fn on_add(&self, object: &Self::Object) -> CoreResult<()>;

    /// Object changed. Defaults to re-running `on_add` on the new object.
    fn on_update(&self, _old: Option<&Self::Object>, new: &Self::Object) -> CoreResult<()> {
        self.on_add(new)
    }

    /// Object was removed.
    fn on_delete(&self, object: &Self::Object) -> CoreResult<()>;
}

/// Tells whether the upstream source finished delivering its initial listing.
///
/// Cloned handles share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SyncGate(Arc<AtomicBool>);

impl SyncGate {
    /// Creates a gate that is not yet synced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate that is already synced.
    #[must_use]
    pub fn synced() -> Self {
        let gate = Self::new();
        gate.mark_synced();
        gate
    }

    /// Records that the initial listing was delivered.
    pub fn mark_synced(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Checks whether the initial listing was delivered.
    #[must_use]
    pub fn has_synced(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Signals downstream consumers that a table has a new consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct SyncNotifier {
    gate: SyncGate,
}

impl SyncNotifier {
    /// Creates a notifier driven by the given gate.
    #[must_use]
    pub fn new(gate: SyncGate) -> Self {
        Self { gate }
    }

    /// Marks `table` for one revision bump when `tx` commits.
    ///
    /// Once the upstream listing is complete, the first notification also
    /// flags the table as synced.
    pub fn notify(&self, table: Table, tx: &mut Transaction) -> StoreResult<()> {
        tx.bump(table)?;
        if self.gate.has_synced() && !tx.is_synced(table) {
            tracing::debug!(%table, "table synced");
            tx.set_sync(table)?;
        }
        Ok(())
    }
}

/// Base shared by all resource handlers.
///
/// Runs a handler's writes in one store transaction and notifies the
/// table's consumers exactly once for it.
#[derive(Debug, Clone)]
pub struct EventHandler {
    store: Arc<Store>,
    notifier: SyncNotifier,
}

impl EventHandler {
    /// Creates a handler base over a store.
    pub fn new(store: Arc<Store>, gate: SyncGate) -> Self {
        Self {
            store,
            notifier: SyncNotifier::new(gate),
        }
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Runs `f` in a write transaction, then notifies `table` and commits.
    ///
    /// If `f` fails nothing is committed and no notification happens.
    pub fn update<F, T>(&self, table: Table, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction) -> CoreResult<T>,
    {
        self.store.update(|tx| {
            let result = f(tx)?;
            self.notifier.notify(table, tx)?;
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use toposync_store::{NodeRecord, Revision, StoreError};

    #[test]
    fn update_bumps_once() {
        let store = Arc::new(Store::new());
        let handler = EventHandler::new(Arc::clone(&store), SyncGate::new());

        handler
            .update(Table::Nodes, |tx| {
                tx.set_node(NodeRecord::new("a"))?;
                tx.set_node(NodeRecord::new("b"))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.revision(Table::Nodes), Revision::new(1));
        assert!(!store.snapshot().is_synced(Table::Nodes));
    }

    #[test]
    fn notify_without_writes_still_bumps() {
        let store = Arc::new(Store::new());
        let handler = EventHandler::new(Arc::clone(&store), SyncGate::new());

        handler.update(Table::Nodes, |_| Ok(())).unwrap();
        assert_eq!(store.revision(Table::Nodes), Revision::new(1));
    }

    #[test]
    fn failed_update_does_not_notify() {
        let store = Arc::new(Store::new());
        let handler = EventHandler::new(Arc::clone(&store), SyncGate::synced());

        let result: CoreResult<()> = handler.update(Table::Nodes, |tx| {
            tx.set_node(NodeRecord::new("a"))?;
            Err(CoreError::from(StoreError::transaction_aborted("boom")))
        });

        assert!(result.is_err());
        let snap = store.snapshot();
        assert_eq!(snap.revision(Table::Nodes), Revision::new(0));
        assert!(!snap.is_synced(Table::Nodes));
        assert!(snap.node("a").is_none());
    }

    #[test]
    fn sync_flag_follows_gate() {
        let store = Arc::new(Store::new());
        let gate = SyncGate::new();
        let handler = EventHandler::new(Arc::clone(&store), gate.clone());

        handler.update(Table::Nodes, |_| Ok(())).unwrap();
        assert!(!store.snapshot().is_synced(Table::Nodes));

        gate.mark_synced();
        handler.update(Table::Nodes, |_| Ok(())).unwrap();
        assert!(store.snapshot().is_synced(Table::Nodes));
        assert!(!store.snapshot().is_synced(Table::Endpoints));
    }
}
