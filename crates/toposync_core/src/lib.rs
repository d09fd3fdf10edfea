//! # Toposync Core
//!
//! Topology reconciliation engine.
//!
//! This crate provides:
//! - Glob-based attribute filtering ([`PatternSet`], [`filter`])
//! - Immutable reconciler configuration ([`ReconcilerConfig`])
//! - Typed upstream events, rejected at the boundary when malformed
//! - A shared handler base with sync notification ([`EventHandler`])
//! - The node reconciler ([`NodeReconciler`])
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use toposync_core::{NativeNode, NodeReconciler, ReconcilerConfig, SyncGate};
//! use toposync_store::Store;
//!
//! let config = ReconcilerConfig::builder()
//!     .label_patterns("topology.kubernetes.io/*")
//!     .build()
//!     .unwrap();
//! let store = Arc::new(Store::new());
//! let reconciler = NodeReconciler::new(Arc::clone(&store), Arc::new(config), SyncGate::new());
//!
//! let node = NativeNode::new("node-a")
//!     .with_label("topology.kubernetes.io/zone", "eu-1a")
//!     .with_label("kubernetes.io/hostname", "node-a");
//! reconciler.upsert(&node).unwrap();
//!
//! let snapshot = store.snapshot();
//! let record = snapshot.node("node-a").unwrap();
//! assert_eq!(record.labels.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod filter;
mod handler;
mod reconciler;

pub use config::{ReconcilerConfig, ReconcilerConfigBuilder};
pub use error::{ConfigError, CoreError, CoreResult};
pub use event::{NativeNode, NodeEvent, ObjectRef, UpstreamObject, WatchEvent};
pub use filter::{filter, PatternSet};
pub use handler::{EventHandler, ResourceHandler, SyncGate, SyncNotifier};
pub use reconciler::NodeReconciler;

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
