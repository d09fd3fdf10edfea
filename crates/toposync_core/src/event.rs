//! Upstream events and the node event adapter.
//!
//! The upstream watch delivers heterogeneous objects. They are decoded into
//! [`WatchEvent`]s carrying an [`UpstreamObject`], then narrowed into a
//! handler-specific event such as [`NodeEvent`]. A payload of the wrong kind
//! is rejected here, before any handler runs.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use toposync_store::Attributes;

/// Node object as delivered by the upstream source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeNode {
    /// Node name.
    pub name: String,
    /// All node labels.
    #[serde(default)]
    pub labels: Attributes,
    /// All node annotations.
    #[serde(default)]
    pub annotations: Attributes,
}

impl NativeNode {
    /// Creates a node without labels or annotations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Reference to a namespaced object handled outside the node reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object namespace.
    #[serde(default)]
    pub namespace: String,
    /// Object name.
    pub name: String,
}

/// Any object the upstream source can deliver.
///
/// Objects are tagged by their `kind` field. A kind this system does not
/// handle decodes as [`UpstreamObject::Unknown`] and keeps the delivered
/// kind, so a rejection can name it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawObject", into = "RawObject")]
pub enum UpstreamObject {
    /// A node.
    Node(NativeNode),
    /// A service.
    Service(ObjectRef),
    /// An endpoints object.
    Endpoints(ObjectRef),
    /// Any kind this system does not know.
    Unknown {
        /// The kind as delivered.
        kind: String,
    },
}

impl UpstreamObject {
    /// Returns the object kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            UpstreamObject::Node(_) => "Node",
            UpstreamObject::Service(_) => "Service",
            UpstreamObject::Endpoints(_) => "Endpoints",
            UpstreamObject::Unknown { kind } => kind,
        }
    }
}

/// Wire form of [`UpstreamObject`]: the union of every known kind's fields.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawObject {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    labels: Attributes,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    annotations: Attributes,
}

impl RawObject {
    fn object_ref(self) -> Result<ObjectRef, String> {
        Ok(ObjectRef {
            name: self.name.ok_or("missing field `name`")?,
            namespace: self.namespace.unwrap_or_default(),
        })
    }
}

impl TryFrom<RawObject> for UpstreamObject {
    type Error = String;

    fn try_from(raw: RawObject) -> Result<Self, String> {
        match raw.kind.as_str() {
            "Node" => Ok(UpstreamObject::Node(NativeNode {
                name: raw.name.ok_or("missing field `name`")?,
                labels: raw.labels,
                annotations: raw.annotations,
            })),
            "Service" => Ok(UpstreamObject::Service(raw.object_ref()?)),
            "Endpoints" => Ok(UpstreamObject::Endpoints(raw.object_ref()?)),
            _ => Ok(UpstreamObject::Unknown { kind: raw.kind }),
        }
    }
}

impl From<UpstreamObject> for RawObject {
    fn from(object: UpstreamObject) -> Self {
        let kind = object.kind().to_string();
        match object {
            UpstreamObject::Node(node) => RawObject {
                kind,
                name: Some(node.name),
                labels: node.labels,
                annotations: node.annotations,
                ..RawObject::default()
            },
            UpstreamObject::Service(obj) | UpstreamObject::Endpoints(obj) => RawObject {
                kind,
                namespace: Some(obj.namespace),
                name: Some(obj.name),
                ..RawObject::default()
            },
            UpstreamObject::Unknown { .. } => RawObject {
                kind,
                ..RawObject::default()
            },
        }
    }
}

/// A lifecycle notification from the upstream watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchEvent {
    /// Object was created.
    Added {
        /// The new object.
        object: UpstreamObject,
    },
    /// Object changed.
    Modified {
        /// The previous object, when the source provides it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old: Option<UpstreamObject>,
        /// The current object.
        object: UpstreamObject,
    },
    /// Object was removed.
    Deleted {
        /// The last known object.
        object: UpstreamObject,
    },
}

impl WatchEvent {
    /// Returns the object the event is about.
    #[must_use]
    pub fn object(&self) -> &UpstreamObject {
        match self {
            WatchEvent::Added { object }
            | WatchEvent::Modified { object, .. }
            | WatchEvent::Deleted { object } => object,
        }
    }
}

/// A node lifecycle event.
///
/// Add and update both become `Upsert`: the node record is always rebuilt
/// from the current object, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// Node was added or changed.
    Upsert(NativeNode),
    /// Node was removed.
    Delete {
        /// Name of the removed node.
        name: String,
    },
}

impl NodeEvent {
    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            NodeEvent::Upsert(node) => &node.name,
            NodeEvent::Delete { name } => name,
        }
    }
}

fn expect_node(object: UpstreamObject) -> CoreResult<NativeNode> {
    match object {
        UpstreamObject::Node(node) => Ok(node),
        other => Err(CoreError::schema_violation("Node", other.kind())),
    }
}

impl TryFrom<WatchEvent> for NodeEvent {
    type Error = CoreError;

    fn try_from(event: WatchEvent) -> CoreResult<Self> {
        match event {
            WatchEvent::Added { object } => Ok(NodeEvent::Upsert(expect_node(object)?)),
            WatchEvent::Modified { old, object } => {
                if let Some(old) = old {
                    expect_node(old)?;
                }
                Ok(NodeEvent::Upsert(expect_node(object)?))
            }
            WatchEvent::Deleted { object } => Ok(NodeEvent::Delete {
                name: expect_node(object)?.name,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_added_node() {
        let json = r#"{"type":"ADDED","object":{"kind":"Node","name":"n1","labels":{"zone":"a"}}}"#;
        let event: WatchEvent = serde_json::from_str(json).unwrap();
        let node_event = NodeEvent::try_from(event).unwrap();
        assert_eq!(
            node_event,
            NodeEvent::Upsert(NativeNode::new("n1").with_label("zone", "a"))
        );
    }

    #[test]
    fn modified_becomes_upsert_of_new_object() {
        let event = WatchEvent::Modified {
            old: Some(UpstreamObject::Node(NativeNode::new("n1").with_label("zone", "a"))),
            object: UpstreamObject::Node(NativeNode::new("n1")),
        };
        assert_eq!(
            NodeEvent::try_from(event).unwrap(),
            NodeEvent::Upsert(NativeNode::new("n1"))
        );
    }

    #[test]
    fn deleted_keeps_only_name() {
        let event = WatchEvent::Deleted {
            object: UpstreamObject::Node(NativeNode::new("n1").with_label("zone", "a")),
        };
        let node_event = NodeEvent::try_from(event).unwrap();
        assert_eq!(node_event.name(), "n1");
        assert!(matches!(node_event, NodeEvent::Delete { .. }));
    }

    #[test]
    fn wrong_kind_is_schema_violation() {
        let event = WatchEvent::Added {
            object: UpstreamObject::Service(ObjectRef {
                namespace: "default".into(),
                name: "web".into(),
            }),
        };
        let err = NodeEvent::try_from(event).unwrap_err();
        assert!(err.is_schema_violation());
        assert_eq!(
            err.to_string(),
            "schema violation: expected Node object, got Service"
        );
    }

    #[test]
    fn unknown_kind_decodes_and_is_rejected() {
        let json = r#"{"type":"ADDED","object":{"kind":"Pod","name":"p"}}"#;
        let event: WatchEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event.object(),
            &UpstreamObject::Unknown {
                kind: "Pod".to_string()
            }
        );

        let err = NodeEvent::try_from(event).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.to_string().contains("Pod"), "{err}");
        assert_eq!(
            err.to_string(),
            "schema violation: expected Node object, got Pod"
        );
    }

    #[test]
    fn node_without_name_is_malformed() {
        let json = r#"{"type":"ADDED","object":{"kind":"Node","labels":{"zone":"a"}}}"#;
        let err = serde_json::from_str::<WatchEvent>(json).unwrap_err();
        assert!(err.to_string().contains("name"), "{err}");
    }

    #[test]
    fn objects_survive_the_wire_form() {
        let events = [
            WatchEvent::Added {
                object: UpstreamObject::Node(
                    NativeNode::new("n1")
                        .with_label("zone", "a")
                        .with_annotation("note", "x"),
                ),
            },
            WatchEvent::Deleted {
                object: UpstreamObject::Endpoints(ObjectRef {
                    namespace: "default".into(),
                    name: "web".into(),
                }),
            },
            WatchEvent::Added {
                object: UpstreamObject::Unknown {
                    kind: "Pod".to_string(),
                },
            },
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let decoded: WatchEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, event);
        }
    }
}
