//! Node reconciler.

use crate::config::ReconcilerConfig;
use crate::error::CoreResult;
use crate::event::{NativeNode, NodeEvent, WatchEvent};
use crate::filter::filter;
use crate::handler::{EventHandler, ResourceHandler, SyncGate};
use std::sync::Arc;
use toposync_store::{NodeRecord, Store, Table};

/// Reconciles node lifecycle events into the store.
///
/// Each event is handled in a single transaction:
/// - the node record is rebuilt from the event's object and upserted;
/// - when topology propagation is on, every endpoint hosted on the node
///   gets the node's filtered labels as its topology;
/// - the nodes table is notified once, however many endpoints changed.
///
/// The reconciler holds no state between events besides the store.
#[derive(Debug, Clone)]
pub struct NodeReconciler {
    base: EventHandler,
    config: Arc<ReconcilerConfig>,
}

impl NodeReconciler {
    /// Creates a reconciler.
    pub fn new(store: Arc<Store>, config: Arc<ReconcilerConfig>, gate: SyncGate) -> Self {
        Self {
            base: EventHandler::new(store, gate),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        self.base.store()
    }

    /// Builds the filtered node record for an upstream node.
    #[must_use]
    pub fn build_record(&self, node: &NativeNode) -> NodeRecord {
        NodeRecord {
            name: node.name.clone(),
            labels: filter(&node.labels, &self.config.label_patterns),
            annotations: filter(&node.annotations, &self.config.annotation_patterns),
        }
    }

    /// Handles an add or update of a node.
    ///
    /// Returns the number of endpoint records whose topology was rewritten.
    pub fn upsert(&self, node: &NativeNode) -> CoreResult<usize> {
        let record = self.build_record(node);
        let name = record.name.clone();
        let labels = record.labels.clone();
        let propagate = self.config.propagates_topology();

        let propagated = self.base.update(Table::Nodes, |tx| {
            tx.set_node(record)?;

            if !propagate {
                return Ok(0);
            }

            // The enumeration only lends out shared borrows; stage copies
            // and write them once it is closed.
            let mut staged = Vec::new();
            tx.each(Table::Endpoints, |kv| {
                if let Some(endpoint) = kv.endpoint() {
                    if endpoint.is_on_node(&name) {
                        let mut endpoint = endpoint.clone();
                        endpoint.topology = labels.clone();
                        staged.push(endpoint);
                    }
                }
                true
            })?;

            let count = staged.len();
            for endpoint in staged {
                tx.set_endpoint(endpoint)?;
            }
            Ok(count)
        })?;

        tracing::debug!(node = %name, propagated, "node upserted");
        Ok(propagated)
    }

    /// Handles the removal of a node.
    ///
    /// Endpoint topology that mirrored the node is left as is.
    pub fn delete(&self, name: &str) -> CoreResult<()> {
        self.base
            .update(Table::Nodes, |tx| Ok(tx.del_node(name)?))?;
        tracing::debug!(node = %name, "node deleted");
        Ok(())
    }

    /// Handles a node event.
    pub fn handle(&self, event: &NodeEvent) -> CoreResult<()> {
        match event {
            NodeEvent::Upsert(node) => self.upsert(node).map(|_| ()),
            NodeEvent::Delete { name } => self.delete(name),
        }
    }

    /// Narrows a raw watch event to a node event and handles it.
    ///
    /// A payload that is not a node fails with
    /// [`CoreError::SchemaViolation`](crate::CoreError::SchemaViolation)
    /// before the store is touched.
    pub fn dispatch(&self, event: WatchEvent) -> CoreResult<()> {
        let event = NodeEvent::try_from(event).inspect_err(|err| {
            tracing::error!(error = %err, "rejected upstream event");
        })?;
        self.handle(&event)
    }
}

impl ResourceHandler for NodeReconciler {
    type Object = NativeNode;

    fn on_add(&self, node: &NativeNode) -> CoreResult<()> {
        self.upsert(node).map(|_| ())
    }

    fn on_delete(&self, node: &NativeNode) -> CoreResult<()> {
        self.delete(&node.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposync_store::{EndpointRecord, Revision, StoreError};

    fn reconciler(config: ReconcilerConfig) -> NodeReconciler {
        NodeReconciler::new(Arc::new(Store::new()), Arc::new(config), SyncGate::new())
    }

    fn zone_config() -> ReconcilerConfig {
        ReconcilerConfig::builder()
            .label_patterns("zone")
            .annotation_patterns("note")
            .build()
            .unwrap()
    }

    #[test]
    fn build_record_filters_both_maps() {
        let r = reconciler(zone_config());
        let node = NativeNode::new("n1")
            .with_label("zone", "a")
            .with_label("os", "linux")
            .with_annotation("note", "x")
            .with_annotation("other", "y");

        let record = r.build_record(&node);
        assert_eq!(record.name, "n1");
        assert_eq!(record.labels.len(), 1);
        assert_eq!(record.labels["zone"], "a");
        assert_eq!(record.annotations.len(), 1);
        assert_eq!(record.annotations["note"], "x");
    }

    #[test]
    fn upsert_ignores_endpoints_without_node() {
        let r = reconciler(zone_config());
        r.store()
            .update(|tx| {
                tx.set_endpoint(EndpointRecord::new("default", "web", "orphan"))?;
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let propagated = r.upsert(&NativeNode::new("").with_label("zone", "a")).unwrap();
        assert_eq!(propagated, 0);

        let snap = r.store().snapshot();
        assert!(snap.endpoints().all(|e| e.topology.is_empty()));
    }

    #[test]
    fn delete_of_absent_node_succeeds() {
        let r = reconciler(zone_config());
        r.delete("missing").unwrap();
        assert_eq!(r.store().revision(Table::Nodes), Revision::new(1));
    }

    #[test]
    fn resource_handler_update_uses_new_object() {
        let r = reconciler(zone_config());
        let old = NativeNode::new("n1").with_label("zone", "a");
        let new = NativeNode::new("n1").with_label("zone", "b");

        r.on_add(&old).unwrap();
        r.on_update(Some(&old), &new).unwrap();

        let snap = r.store().snapshot();
        assert_eq!(snap.node("n1").unwrap().labels["zone"], "b");

        r.on_delete(&new).unwrap();
        assert!(r.store().snapshot().node("n1").is_none());
    }
}
