//! Test fixtures.
//!
//! Provides a ready-wired store + reconciler and helpers for seeding
//! endpoint records and writing event logs.

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use toposync_core::{NodeReconciler, ReconcilerConfig, SyncGate, WatchEvent};
use toposync_store::{Attributes, EndpointRecord, Store, StoreError};

/// A store with a node reconciler attached.
pub struct TestTopology {
    /// The store.
    pub store: Arc<Store>,
    /// The upstream sync gate.
    pub gate: SyncGate,
    /// The reconciler under test.
    pub reconciler: NodeReconciler,
}

impl TestTopology {
    /// Creates a topology with the given configuration.
    pub fn new(config: ReconcilerConfig) -> Self {
        let store = Arc::new(Store::new());
        let gate = SyncGate::new();
        let reconciler = NodeReconciler::new(Arc::clone(&store), Arc::new(config), gate.clone());
        Self {
            store,
            gate,
            reconciler,
        }
    }

    /// Creates a topology that mirrors labels matching `label_patterns`
    /// onto endpoints.
    pub fn propagating(label_patterns: &str) -> Self {
        Self::new(
            ReconcilerConfig::builder()
                .label_patterns(label_patterns)
                .build()
                .expect("Invalid label patterns"),
        )
    }

    /// Creates a topology where endpoint slices own endpoint topology.
    pub fn slice_managed(label_patterns: &str) -> Self {
        Self::new(
            ReconcilerConfig::builder()
                .label_patterns(label_patterns)
                .manage_endpoint_slices(true)
                .build()
                .expect("Invalid label patterns"),
        )
    }

    /// Seeds endpoints given as `(key, node_name)` pairs in service
    /// `default/web`.
    #[must_use]
    pub fn with_endpoints(self, endpoints: &[(&str, &str)]) -> Self {
        seed_endpoints(
            &self.store,
            endpoints.iter().map(|(key, node)| endpoint(key, node)),
        );
        self
    }

    /// Returns the topology of every endpoint hosted on `node_name`.
    pub fn topologies_on(&self, node_name: &str) -> Vec<Attributes> {
        self.store
            .snapshot()
            .endpoints_on_node(node_name)
            .map(|e| e.topology.clone())
            .collect()
    }
}

/// Builds an endpoint of service `default/web` on a node.
pub fn endpoint(key: &str, node_name: &str) -> EndpointRecord {
    EndpointRecord::new("default", "web", key).on_node(node_name)
}

/// Builds an attribute map from pairs.
pub fn attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Writes endpoints into the store in one transaction.
pub fn seed_endpoints(store: &Store, endpoints: impl IntoIterator<Item = EndpointRecord>) {
    store
        .update(|tx| {
            for ep in endpoints {
                tx.set_endpoint(ep)?;
            }
            Ok::<_, StoreError>(())
        })
        .expect("Failed to seed endpoints");
}

/// Writes watch events as a JSON-lines file.
pub fn write_event_log(events: &[WatchEvent]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    for event in events {
        let line = serde_json::to_string(event).expect("Failed to encode event");
        writeln!(file, "{line}").expect("Failed to write event");
    }
    file.flush().expect("Failed to flush event log");
    file
}

/// Writes endpoints as a JSON array file.
pub fn write_endpoint_file(endpoints: &[EndpointRecord]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    serde_json::to_writer(&mut file, endpoints).expect("Failed to encode endpoints");
    file.flush().expect("Failed to flush endpoint file");
    file
}
