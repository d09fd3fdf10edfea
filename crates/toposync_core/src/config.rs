//! Reconciler configuration.

use crate::error::ConfigError;
use crate::filter::PatternSet;

/// Process-wide reconciler parameters.
///
/// Built once at startup, validated by [`ReconcilerConfigBuilder::build`],
/// then shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Overrides the local node identity.
    pub node_name: Option<String>,

    /// Node labels to retain and propagate.
    pub label_patterns: PatternSet,

    /// Node annotations to retain.
    pub annotation_patterns: PatternSet,

    /// Endpoint slices carry their own topology; node events must not
    /// touch endpoint records.
    pub manage_endpoint_slices: bool,
}

impl ReconcilerConfig {
    /// Creates a builder with default values.
    #[must_use]
    pub fn builder() -> ReconcilerConfigBuilder {
        ReconcilerConfigBuilder::default()
    }

    /// Checks whether node labels are mirrored onto endpoint topology.
    #[must_use]
    pub fn propagates_topology(&self) -> bool {
        !self.manage_endpoint_slices
    }

    /// Returns the node name override, or `fallback` if none is set.
    #[must_use]
    pub fn effective_node_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.node_name.as_deref().unwrap_or(fallback)
    }
}

/// Builder for [`ReconcilerConfig`].
///
/// Patterns are kept as raw comma-separated strings until `build`, where
/// they are compiled; malformed patterns fail there rather than per event.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfigBuilder {
    node_name: Option<String>,
    label_patterns: String,
    annotation_patterns: String,
    manage_endpoint_slices: bool,
}

impl ReconcilerConfigBuilder {
    /// Sets the node name override. An empty name clears it.
    #[must_use]
    pub fn node_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.node_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Sets the comma-separated label patterns.
    #[must_use]
    pub fn label_patterns(mut self, patterns: impl Into<String>) -> Self {
        self.label_patterns = patterns.into();
        self
    }

    /// Sets the comma-separated annotation patterns.
    #[must_use]
    pub fn annotation_patterns(mut self, patterns: impl Into<String>) -> Self {
        self.annotation_patterns = patterns.into();
        self
    }

    /// Sets whether endpoint slices manage endpoint topology.
    #[must_use]
    pub const fn manage_endpoint_slices(mut self, value: bool) -> Self {
        self.manage_endpoint_slices = value;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ReconcilerConfig, ConfigError> {
        let config = ReconcilerConfig {
            node_name: self.node_name,
            label_patterns: PatternSet::parse(&self.label_patterns)?,
            annotation_patterns: PatternSet::parse(&self.annotation_patterns)?,
            manage_endpoint_slices: self.manage_endpoint_slices,
        };
        tracing::debug!(
            node_name = ?config.node_name,
            labels = ?config.label_patterns.patterns(),
            annotations = ?config.annotation_patterns.patterns(),
            propagate = config.propagates_topology(),
            "reconciler configuration"
        );
        Ok(config)
    }
}
