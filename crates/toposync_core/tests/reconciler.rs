//! Integration tests for the node reconciler.

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use toposync_core::{
    filter, CoreError, NativeNode, ObjectRef, PatternSet, UpstreamObject, WatchEvent,
};
use toposync_store::{Revision, Table};
use toposync_testkit::prelude::*;

fn zone_node(name: &str, zone: &str) -> NativeNode {
    NativeNode::new(name)
        .with_label("zone", zone)
        .with_label("kubernetes.io/hostname", name)
}

#[test]
fn filter_selects_exact_subset() {
    let labels = attributes(&[("a", "1"), ("b", "2")]);
    let set = PatternSet::new(["a"]).unwrap();
    assert_eq!(filter(&labels, &set), attributes(&[("a", "1")]));
    assert_eq!(filter(&labels, &PatternSet::empty()), attributes(&[]));
}

#[test]
fn upsert_twice_is_idempotent() {
    let topo = TestTopology::propagating("zone").with_endpoints(&[("a", "n1"), ("b", "n2")]);
    let node = zone_node("n1", "a");

    topo.reconciler.upsert(&node).unwrap();
    let once = topo.store.snapshot();
    topo.reconciler.upsert(&node).unwrap();
    let twice = topo.store.snapshot();

    assert_eq!(
        once.nodes().collect::<Vec<_>>(),
        twice.nodes().collect::<Vec<_>>()
    );
    assert_eq!(
        once.endpoints().collect::<Vec<_>>(),
        twice.endpoints().collect::<Vec<_>>()
    );
}

#[test]
fn upsert_propagates_labels_to_hosted_endpoints() {
    let topo = TestTopology::propagating("zone")
        .with_endpoints(&[("a", "n1"), ("b", "n1"), ("c", "n1"), ("d", "n2")]);

    let propagated = topo
        .reconciler
        .upsert(&NativeNode::new("n1").with_label("zone", "a"))
        .unwrap();

    assert_eq!(propagated, 3);
    let topologies = topo.topologies_on("n1");
    assert_eq!(topologies.len(), 3);
    assert!(topologies
        .iter()
        .all(|t| *t == attributes(&[("zone", "a")])));
    assert!(topo.topologies_on("n2")[0].is_empty());
}

#[test]
fn propagated_topology_is_filtered() {
    let topo = TestTopology::propagating("zone").with_endpoints(&[("a", "n1")]);
    topo.reconciler.upsert(&zone_node("n1", "eu-1")).unwrap();

    assert_eq!(
        topo.topologies_on("n1"),
        vec![attributes(&[("zone", "eu-1")])]
    );
}

#[test]
fn slice_managed_mode_never_touches_endpoints() {
    let topo = TestTopology::slice_managed("zone")
        .with_endpoints(&[("a", "n1"), ("b", "n1"), ("c", "n1")]);
    let before = topo.store.snapshot();

    let propagated = topo
        .reconciler
        .upsert(&NativeNode::new("n1").with_label("zone", "a"))
        .unwrap();

    let after = topo.store.snapshot();
    assert_eq!(propagated, 0);
    assert_eq!(
        before.endpoints().collect::<Vec<_>>(),
        after.endpoints().collect::<Vec<_>>()
    );
    assert_eq!(
        after.revision(Table::Endpoints),
        before.revision(Table::Endpoints)
    );
    assert!(after.node("n1").is_some());
}

#[test]
fn delete_removes_node() {
    let topo = TestTopology::propagating("zone");
    topo.reconciler.upsert(&zone_node("n1", "a")).unwrap();
    assert!(topo.store.snapshot().node("n1").is_some());

    topo.reconciler.delete("n1").unwrap();
    assert!(topo.store.snapshot().node("n1").is_none());
}

#[test]
fn delete_leaves_endpoint_topology_untouched() {
    let topo = TestTopology::propagating("zone").with_endpoints(&[("a", "n1")]);
    topo.reconciler.upsert(&zone_node("n1", "a")).unwrap();
    let endpoints_rev = topo.store.revision(Table::Endpoints);

    topo.reconciler.delete("n1").unwrap();

    assert_eq!(
        topo.topologies_on("n1"),
        vec![attributes(&[("zone", "a")])]
    );
    assert_eq!(topo.store.revision(Table::Endpoints), endpoints_rev);
}

#[test]
fn upsert_notifies_nodes_table_once() {
    let topo = TestTopology::propagating("zone")
        .with_endpoints(&[("a", "n1"), ("b", "n1"), ("c", "n1")]);
    let rx = topo.store.subscribe();
    let before = topo.store.revision(Table::Nodes);

    topo.reconciler
        .upsert(&NativeNode::new("n1").with_label("zone", "a"))
        .unwrap();

    assert_eq!(
        topo.store.revision(Table::Nodes),
        Revision::new(before.as_u64() + 1)
    );
    let node_events = rx
        .try_iter()
        .filter(|e| e.table == Table::Nodes)
        .count();
    assert_eq!(node_events, 1);
}

#[test]
fn update_replaces_labels_wholesale() {
    let topo = TestTopology::propagating("*").with_endpoints(&[("a", "n1")]);
    topo.reconciler
        .upsert(
            &NativeNode::new("n1")
                .with_label("zone", "a")
                .with_label("rack", "r1"),
        )
        .unwrap();
    topo.reconciler
        .upsert(&NativeNode::new("n1").with_label("zone", "b"))
        .unwrap();

    let snap = topo.store.snapshot();
    assert_eq!(
        snap.node("n1").unwrap().labels,
        attributes(&[("zone", "b")])
    );
    assert_eq!(
        topo.topologies_on("n1"),
        vec![attributes(&[("zone", "b")])]
    );
}

#[test]
fn dispatch_rejects_foreign_kinds_without_writing() {
    let topo = TestTopology::propagating("zone");
    let event = WatchEvent::Added {
        object: UpstreamObject::Endpoints(ObjectRef {
            namespace: "default".into(),
            name: "web".into(),
        }),
    };

    let err = topo.reconciler.dispatch(event).unwrap_err();
    assert!(matches!(err, CoreError::SchemaViolation { expected: "Node", .. }));
    assert_eq!(topo.store.committed_seq().as_u64(), 0);
}

#[test]
fn dispatch_full_lifecycle() {
    let topo = TestTopology::propagating("zone").with_endpoints(&[("a", "n1")]);
    let v1 = UpstreamObject::Node(zone_node("n1", "a"));
    let v2 = UpstreamObject::Node(zone_node("n1", "b"));

    topo.reconciler
        .dispatch(WatchEvent::Added { object: v1.clone() })
        .unwrap();
    topo.reconciler
        .dispatch(WatchEvent::Modified {
            old: Some(v1),
            object: v2.clone(),
        })
        .unwrap();
    assert_eq!(
        topo.topologies_on("n1"),
        vec![attributes(&[("zone", "b")])]
    );

    topo.reconciler
        .dispatch(WatchEvent::Deleted { object: v2 })
        .unwrap();
    let snap = topo.store.snapshot();
    assert!(snap.node("n1").is_none());
    assert_eq!(snap.revision(Table::Nodes), Revision::new(3));
}

#[test]
fn nodes_table_synced_after_gate_opens() {
    let topo = TestTopology::propagating("zone");
    topo.reconciler.upsert(&zone_node("n1", "a")).unwrap();
    assert!(!topo.store.snapshot().is_synced(Table::Nodes));

    topo.gate.mark_synced();
    topo.reconciler.upsert(&zone_node("n2", "a")).unwrap();
    assert!(topo.store.snapshot().is_synced(Table::Nodes));
}

#[test]
fn concurrent_upserts_keep_topology_consistent() {
    let endpoints: Vec<(String, String)> = (0..40)
        .map(|i| (format!("ep-{i}"), format!("n{}", i % 4)))
        .collect();
    let pairs: Vec<(&str, &str)> = endpoints
        .iter()
        .map(|(k, n)| (k.as_str(), n.as_str()))
        .collect();
    let topo = Arc::new(TestTopology::propagating("zone").with_endpoints(&pairs));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let topo = Arc::clone(&topo);
            thread::spawn(move || {
                for round in 0..20 {
                    let node = zone_node(&format!("n{n}"), &format!("z{round}"));
                    topo.reconciler.upsert(&node).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snap = topo.store.snapshot();
    for node in snap.nodes() {
        for ep in snap.endpoints_on_node(&node.name) {
            assert_eq!(ep.topology, node.labels);
        }
    }
    assert_eq!(snap.revision(Table::Nodes), Revision::new(80));
}

proptest! {
    #[test]
    fn filter_is_a_deterministic_subset(
        attrs in attributes_strategy(),
        patterns in pattern_list_strategy(),
    ) {
        let set = PatternSet::parse(&patterns).unwrap();
        let first = filter(&attrs, &set);
        let second = filter(&attrs, &set);
        prop_assert_eq!(&first, &second);
        for (key, value) in &first {
            prop_assert_eq!(attrs.get(key), Some(value));
            prop_assert!(set.matches(key));
        }
        for key in attrs.keys() {
            prop_assert_eq!(first.contains_key(key), set.matches(key));
        }
    }

    #[test]
    fn propagation_invariant_holds_after_any_event_sequence(
        endpoints in endpoints_strategy(),
        nodes in prop::collection::vec(native_node_strategy(), 1..10),
        patterns in pattern_list_strategy(),
    ) {
        let topo = TestTopology::propagating(&patterns);
        seed_endpoints(&topo.store, endpoints);

        for node in &nodes {
            topo.reconciler.upsert(node).unwrap();

            let snap = topo.store.snapshot();
            let record = snap.node(&node.name).unwrap();
            for ep in snap.endpoints_on_node(&node.name) {
                prop_assert_eq!(&ep.topology, &record.labels);
            }
        }
    }

    #[test]
    fn slice_managed_mode_preserves_endpoints(
        endpoints in endpoints_strategy(),
        nodes in prop::collection::vec(native_node_strategy(), 1..10),
    ) {
        let topo = TestTopology::slice_managed("*");
        seed_endpoints(&topo.store, endpoints);
        let before = topo.store.snapshot();

        for node in &nodes {
            topo.reconciler.upsert(node).unwrap();
        }

        let after = topo.store.snapshot();
        prop_assert_eq!(
            before.endpoints().collect::<Vec<_>>(),
            after.endpoints().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            before.revision(Table::Endpoints),
            after.revision(Table::Endpoints)
        );
    }
}
