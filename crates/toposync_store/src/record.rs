//! Record types stored in the topology tables.

use crate::types::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered string attributes (labels, annotations, topology).
pub type Attributes = BTreeMap<String, String>;

/// Filtered internal representation of a cluster node.
///
/// Identity is `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name.
    pub name: String,
    /// Retained labels.
    #[serde(default)]
    pub labels: Attributes,
    /// Retained annotations.
    #[serde(default)]
    pub annotations: Attributes,
}

impl NodeRecord {
    /// Creates a node record with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: Attributes) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: Attributes) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Identity of an endpoint record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointKey {
    /// Namespace of the owning service.
    pub namespace: String,
    /// Name of the owning service.
    pub service_name: String,
    /// Endpoint key, unique within the service.
    pub key: String,
}

impl EndpointKey {
    /// Creates an endpoint key.
    pub fn new(
        namespace: impl Into<String>,
        service_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            service_name: service_name.into(),
            key: key.into(),
        }
    }
}

/// Internal representation of a service endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Namespace of the owning service.
    pub namespace: String,
    /// Name of the owning service.
    pub service_name: String,
    /// Endpoint key, unique within the service.
    pub key: String,
    /// Owning node; empty when the endpoint has no node.
    #[serde(default)]
    pub node_name: String,
    /// Endpoint hostname.
    #[serde(default)]
    pub hostname: String,
    /// Endpoint addresses.
    #[serde(default)]
    pub ips: Vec<String>,
    /// Mirror of the owning node's labels.
    #[serde(default)]
    pub topology: Attributes,
}

impl EndpointRecord {
    /// Creates an endpoint record.
    pub fn new(
        namespace: impl Into<String>,
        service_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            service_name: service_name.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    /// Sets the owning node.
    #[must_use]
    pub fn on_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    /// Returns the record identity.
    #[must_use]
    pub fn id(&self) -> EndpointKey {
        EndpointKey::new(&self.namespace, &self.service_name, &self.key)
    }

    /// Checks whether this endpoint belongs to the given node.
    ///
    /// An empty `node_name` never matches.
    #[must_use]
    pub fn is_on_node(&self, node_name: &str) -> bool {
        !self.node_name.is_empty() && self.node_name == node_name
    }
}

/// Identity of a service record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    /// Service namespace.
    pub namespace: String,
    /// Service name.
    pub name: String,
}

impl ServiceKey {
    /// Creates a service key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// A service port mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port name.
    #[serde(default)]
    pub name: String,
    /// Protocol (TCP, UDP, SCTP).
    #[serde(default)]
    pub protocol: String,
    /// Service port.
    pub port: u16,
    /// Backend port.
    #[serde(default)]
    pub target_port: u16,
}

/// Internal representation of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Service namespace.
    pub namespace: String,
    /// Service name.
    pub name: String,
    /// Cluster IP, if any.
    #[serde(default)]
    pub cluster_ip: Option<String>,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Retained labels.
    #[serde(default)]
    pub labels: Attributes,
}

impl ServiceRecord {
    /// Creates a service record.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the record identity.
    #[must_use]
    pub fn id(&self) -> ServiceKey {
        ServiceKey::new(&self.namespace, &self.name)
    }
}

/// A borrowed entry yielded while enumerating a table.
///
/// Entries are shared borrows: a visitor can read them and stage copies
/// but cannot mutate the table being enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kv<'a> {
    /// Entry of the services table.
    Service(&'a ServiceRecord),
    /// Entry of the endpoints table.
    Endpoint(&'a EndpointRecord),
    /// Entry of the nodes table.
    Node(&'a NodeRecord),
}

impl<'a> Kv<'a> {
    /// Returns the table this entry belongs to.
    #[must_use]
    pub fn table(&self) -> Table {
        match self {
            Kv::Service(_) => Table::Services,
            Kv::Endpoint(_) => Table::Endpoints,
            Kv::Node(_) => Table::Nodes,
        }
    }

    /// Returns the service, if this is a services entry.
    #[must_use]
    pub fn service(&self) -> Option<&'a ServiceRecord> {
        match *self {
            Kv::Service(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the endpoint, if this is an endpoints entry.
    #[must_use]
    pub fn endpoint(&self) -> Option<&'a EndpointRecord> {
        match *self {
            Kv::Endpoint(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the node, if this is a nodes entry.
    #[must_use]
    pub fn node(&self) -> Option<&'a NodeRecord> {
        match *self {
            Kv::Node(n) => Some(n),
            _ => None,
        }
    }
}
