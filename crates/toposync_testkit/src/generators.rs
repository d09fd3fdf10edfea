//! Property-based test generators using proptest.

use proptest::prelude::*;
use toposync_core::NativeNode;
use toposync_store::{Attributes, EndpointRecord};

/// Strategy for attribute keys, optionally prefixed like
/// `topology.kubernetes.io/zone`.
pub fn attribute_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{1,4}\\.io/[a-z]{1,6}").expect("Invalid regex"),
    ]
}

/// Strategy for attribute maps.
pub fn attributes_strategy() -> impl Strategy<Value = Attributes> {
    prop::collection::btree_map(
        attribute_key_strategy(),
        prop::string::string_regex("[a-z0-9]{0,6}").expect("Invalid regex"),
        0..8,
    )
}

/// Strategy for a small comma-separated list of valid globs.
pub fn pattern_list_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            attribute_key_strategy(),
            prop::string::string_regex("[a-z]{1,2}\\*").expect("Invalid regex"),
            Just("*.io/*".to_string()),
        ],
        0..4,
    )
    .prop_map(|patterns| patterns.join(","))
}

/// Strategy for a node named one of `n0`..`n3`.
pub fn native_node_strategy() -> impl Strategy<Value = NativeNode> {
    (0u8..4, attributes_strategy(), attributes_strategy()).prop_map(
        |(i, labels, annotations)| NativeNode {
            name: format!("n{i}"),
            labels,
            annotations,
        },
    )
}

/// Strategy for endpoints spread over nodes `n0`..`n3`, some without node.
pub fn endpoints_strategy() -> impl Strategy<Value = Vec<EndpointRecord>> {
    prop::collection::vec(prop::option::of(0u8..4), 0..12).prop_map(|nodes| {
        nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                let ep = EndpointRecord::new("default", "web", format!("ep-{i}"));
                match node {
                    Some(n) => ep.on_node(format!("n{n}")),
                    None => ep,
                }
            })
            .collect()
    })
}
