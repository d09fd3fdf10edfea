//! # Toposync Testkit
//!
//! Test utilities for toposync.
//!
//! This crate provides:
//! - Fixtures wiring a store, a gate and a node reconciler together
//! - Property-based test generators using proptest
//! - Temporary event log files for replay tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toposync_testkit::prelude::*;
//!
//! #[test]
//! fn propagates() {
//!     let topo = TestTopology::propagating("zone").with_endpoints(&[("a", "n1")]);
//!     topo.reconciler.upsert(&NativeNode::new("n1").with_label("zone", "a")).unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use toposync_core::{NativeNode, NodeReconciler, ReconcilerConfig, SyncGate};
    pub use toposync_store::{EndpointRecord, NodeRecord, Revision, Store, Table};
}

pub use fixtures::*;
pub use generators::*;
