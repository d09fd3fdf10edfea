//! # Toposync Store
//!
//! Transactional store for cluster topology records.
//!
//! This crate provides:
//! - Typed tables for services, endpoints and nodes
//! - Single-writer transactions with staged writes and read-your-writes
//! - Copy-on-write snapshots published atomically on commit
//! - Per-table revisions and initial-sync flags
//! - A revision feed for downstream consumers
//!
//! ## Example
//!
//! ```rust
//! use toposync_store::{NodeRecord, Store, StoreError, Table};
//!
//! let store = Store::new();
//! store
//!     .update(|tx| {
//!         tx.set_node(NodeRecord::new("node-a"))?;
//!         Ok::<_, StoreError>(())
//!     })
//!     .unwrap();
//!
//! let snapshot = store.snapshot();
//! assert!(snapshot.node("node-a").is_some());
//! assert_eq!(snapshot.revision(Table::Nodes).as_u64(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod feed;
mod record;
mod snapshot;
mod store;
mod transaction;
mod types;

pub use error::{StoreError, StoreResult};
pub use feed::{RevisionEvent, RevisionFeed};
pub use record::{
    Attributes, EndpointKey, EndpointRecord, Kv, NodeRecord, PortMapping, ServiceKey,
    ServiceRecord,
};
pub use snapshot::Snapshot;
pub use store::{Store, StoreConfig};
pub use transaction::{
    PendingWrite, Transaction, TransactionManager, TransactionState, WriteTransaction,
};
pub use types::{Revision, SequenceNumber, Table, TransactionId};

/// Store crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
