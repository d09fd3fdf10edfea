//! Immutable committed view of the store.

use crate::record::{EndpointKey, EndpointRecord, Kv, NodeRecord, ServiceKey, ServiceRecord};
use crate::types::{Revision, SequenceNumber, Table};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Table contents, shared between snapshots until a commit writes to it.
pub(crate) type TableMap<K, V> = Arc<BTreeMap<K, Arc<V>>>;

/// A consistent, committed state of every table.
///
/// Snapshots are never mutated once published. Each commit builds the next
/// snapshot from the previous one and swaps it in atomically, so a reader
/// holding a snapshot always sees whole transactions. Tables a commit does
/// not write stay shared with the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub(crate) sequence: SequenceNumber,
    pub(crate) services: TableMap<ServiceKey, ServiceRecord>,
    pub(crate) endpoints: TableMap<EndpointKey, EndpointRecord>,
    pub(crate) nodes: TableMap<String, NodeRecord>,
    pub(crate) revisions: BTreeMap<Table, Revision>,
    pub(crate) synced: BTreeSet<Table>,
}

impl Snapshot {
    /// Returns the sequence of the commit that produced this snapshot.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Returns the revision of a table.
    #[must_use]
    pub fn revision(&self, table: Table) -> Revision {
        self.revisions.get(&table).copied().unwrap_or_default()
    }

    /// Checks whether a table received its initial full listing.
    #[must_use]
    pub fn is_synced(&self, table: Table) -> bool {
        self.synced.contains(&table)
    }

    /// Checks whether every table is synced.
    #[must_use]
    pub fn all_synced(&self) -> bool {
        Table::ALL.iter().all(|t| self.synced.contains(t))
    }

    /// Gets a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name).map(Arc::as_ref)
    }

    /// Iterates nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values().map(Arc::as_ref)
    }

    /// Gets an endpoint by key.
    #[must_use]
    pub fn endpoint(&self, key: &EndpointKey) -> Option<&EndpointRecord> {
        self.endpoints.get(key).map(Arc::as_ref)
    }

    /// Iterates endpoints in key order.
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.endpoints.values().map(Arc::as_ref)
    }

    /// Iterates the endpoints hosted on a node.
    pub fn endpoints_on_node<'a>(
        &'a self,
        node_name: &'a str,
    ) -> impl Iterator<Item = &'a EndpointRecord> + 'a {
        self.endpoints().filter(move |e| e.is_on_node(node_name))
    }

    /// Gets a service by key.
    #[must_use]
    pub fn service(&self, key: &ServiceKey) -> Option<&ServiceRecord> {
        self.services.get(key).map(Arc::as_ref)
    }

    /// Iterates services in key order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.services.values().map(Arc::as_ref)
    }

    /// Returns the number of entries in a table.
    #[must_use]
    pub fn len(&self, table: Table) -> usize {
        match table {
            Table::Services => self.services.len(),
            Table::Endpoints => self.endpoints.len(),
            Table::Nodes => self.nodes.len(),
        }
    }

    /// Checks whether every table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Table::ALL.iter().all(|&t| self.len(t) == 0)
    }

    /// Enumerates a table in key order.
    ///
    /// Returns `false` if the visitor stopped the enumeration early.
    pub fn each<F>(&self, table: Table, mut visit: F) -> bool
    where
        F: FnMut(Kv<'_>) -> bool,
    {
        match table {
            Table::Services => self.services.values().all(|s| visit(Kv::Service(s))),
            Table::Endpoints => self.endpoints.values().all(|e| visit(Kv::Endpoint(e))),
            Table::Nodes => self.nodes.values().all(|n| visit(Kv::Node(n))),
        }
    }
}
