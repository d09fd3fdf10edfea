//! Attribute filtering by glob patterns.
//!
//! Nothing is retained by default: an attribute survives only if its key
//! matches at least one configured pattern. Pattern syntax is that of
//! [`globset`](https://docs.rs/globset/latest/globset/#syntax), with `/`
//! treated as a separator: `*`, `?` and `[...]` never match it, so `*`
//! selects unprefixed keys only and `*/zone` selects `zone` under any
//! single prefix. Use `**` to cross prefixes.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use toposync_store::Attributes;

/// A compiled set of glob patterns matched against attribute keys.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compiles a pattern set.
    ///
    /// Fails on the first malformed pattern.
    pub fn new(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self, ConfigError> {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect::<Vec<_>>();

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(ConfigError::PatternSet)?;

        Ok(Self { patterns, set })
    }

    /// Parses a comma-separated pattern list, as given on the command line.
    ///
    /// Blank entries are ignored, so `""` yields the empty set.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(',').map(str::trim).filter(|p| !p.is_empty()))
    }

    /// Returns a set that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Returns the source patterns.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Checks whether the set has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks whether a key matches any pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.set.is_match(key)
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for PatternSet {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}

impl Eq for PatternSet {}

/// Returns the entries of `attrs` whose key matches at least one pattern.
#[must_use]
pub fn filter(attrs: &Attributes, patterns: &PatternSet) -> Attributes {
    if patterns.is_empty() {
        return Attributes::new();
    }

    attrs
        .iter()
        .filter(|(key, _)| patterns.matches(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn exact_key_selects_subset() {
        let labels = attrs(&[("a", "1"), ("b", "2")]);
        let set = PatternSet::new(["a"]).unwrap();
        assert_eq!(filter(&labels, &set), attrs(&[("a", "1")]));
    }

    #[test]
    fn empty_set_yields_empty_map() {
        let labels = attrs(&[("a", "1"), ("b", "2")]);
        assert!(filter(&labels, &PatternSet::empty()).is_empty());
        assert!(filter(&labels, &PatternSet::parse("").unwrap()).is_empty());
    }

    #[test]
    fn wildcard_matches_prefixed_keys() {
        let labels = attrs(&[
            ("topology.kubernetes.io/zone", "a"),
            ("topology.kubernetes.io/region", "eu"),
            ("kubernetes.io/hostname", "n1"),
        ]);
        let set = PatternSet::parse("topology.kubernetes.io/*").unwrap();
        assert_eq!(
            filter(&labels, &set),
            attrs(&[
                ("topology.kubernetes.io/region", "eu"),
                ("topology.kubernetes.io/zone", "a"),
            ])
        );
    }

    #[test]
    fn any_pattern_is_enough() {
        let labels = attrs(&[("zone", "a"), ("rack", "r1"), ("os", "linux")]);
        let set = PatternSet::parse("zone, rack").unwrap();
        assert_eq!(set.patterns(), ["zone", "rack"]);
        assert_eq!(filter(&labels, &set), attrs(&[("rack", "r1"), ("zone", "a")]));
    }

    #[test]
    fn parse_ignores_blank_entries() {
        let set = PatternSet::parse(",,a,, ,").unwrap();
        assert_eq!(set.patterns(), ["a"]);
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = PatternSet::parse("zone,[a-").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "[a-"));
    }

    #[test]
    fn pattern_must_match_whole_key() {
        let set = PatternSet::new(["zone"]).unwrap();
        assert!(set.matches("zone"));
        assert!(!set.matches("zone2"));
        assert!(!set.matches("my-zone"));
    }

    #[test]
    fn wildcard_stops_at_prefix_separator() {
        let labels = attrs(&[
            ("zone", "a"),
            ("topology.kubernetes.io/zone", "b"),
            ("kubernetes.io/hostname", "n1"),
        ]);

        let bare = PatternSet::parse("*").unwrap();
        assert_eq!(filter(&labels, &bare), attrs(&[("zone", "a")]));

        let any_prefix = PatternSet::parse("*/zone").unwrap();
        assert_eq!(
            filter(&labels, &any_prefix),
            attrs(&[("topology.kubernetes.io/zone", "b")])
        );

        let everything = PatternSet::parse("**").unwrap();
        assert_eq!(filter(&labels, &everything), labels);
    }
}
