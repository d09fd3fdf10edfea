//! CLI command implementations.

pub mod replay;
