//! Error types for reconciliation.

use thiserror::Error;
use toposync_store::StoreError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while reconciling events.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store transaction failed; the whole transaction was discarded.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Event payload is not the entity kind this handler consumes.
    ///
    /// This is a contract breach by the upstream source and must not be
    /// retried or silently dropped.
    #[error("schema violation: expected {expected} object, got {found}")]
    SchemaViolation {
        /// Kind the handler consumes.
        expected: &'static str,
        /// Kind that was delivered.
        found: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Creates a schema violation error.
    pub fn schema_violation(expected: &'static str, found: impl Into<String>) -> Self {
        Self::SchemaViolation {
            expected,
            found: found.into(),
        }
    }

    /// Checks whether this error breaches the upstream contract.
    #[must_use]
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }
}

/// Errors detected while validating configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A glob pattern failed to parse.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: globset::Error,
    },

    /// Compiling the pattern set failed.
    #[error("invalid pattern set: {0}")]
    PatternSet(#[source] globset::Error),
}
