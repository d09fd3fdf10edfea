//! Single-writer transactions over the topology tables.
//!
//! Transactions provide:
//! - **Atomicity**: staged writes become visible together on commit, or not at all
//! - **Isolation**: readers only ever see committed snapshots
//! - **Serialization**: one write transaction at a time, store-wide

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{PendingWrite, Transaction, TransactionState, WriteTransaction};
