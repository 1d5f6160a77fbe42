// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Repository configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};

/// Tuning knobs for a [`Repository`](crate::Repository) and its stores.
///
/// Every field has a default, so partial JSON documents deserialize cleanly:
///
/// ```
/// use renderdb_repository::RepositoryConfig;
///
/// let config = RepositoryConfig::from_json_str(r#"{ "fetch_chunk_size": 50 }"#).unwrap();
/// assert_eq!(config.fetch_chunk_size, 50);
/// assert_eq!(config.channel_capacity, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Buffer size of every result stream. A full buffer suspends the producer.
    /// Default: 200
    pub channel_capacity: usize,

    /// Maximum number of identifiers per store round-trip (SQL parameter lists
    /// are limited in size). Also the page size used when replaying.
    /// Default: 200
    pub fetch_chunk_size: usize,

    /// Maximum children per R-tree node.
    /// Default: 8
    pub rtree_max_children: usize,

    /// Minimum children per R-tree node after a split.
    /// Default: 4
    pub rtree_min_children: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 200,
            fetch_chunk_size: 200,
            rtree_max_children: renderdb_index::backends::rtree::DEFAULT_MAX_CHILDREN,
            rtree_min_children: renderdb_index::backends::rtree::DEFAULT_MIN_CHILDREN,
        }
    }
}

impl RepositoryConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the result stream buffer size.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the number of identifiers fetched per store round-trip.
    pub fn with_fetch_chunk_size(mut self, chunk: usize) -> Self {
        self.fetch_chunk_size = chunk;
        self
    }

    /// Set the R-tree node fanout.
    pub fn with_rtree_fanout(mut self, max_children: usize, min_children: usize) -> Self {
        self.rtree_max_children = max_children;
        self.rtree_min_children = min_children;
        self
    }

    /// Check that the values can be used.
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(RepositoryError::invalid_option(0, "channel_capacity must be positive"));
        }
        if self.fetch_chunk_size == 0 {
            return Err(RepositoryError::invalid_option(0, "fetch_chunk_size must be positive"));
        }
        if self.rtree_max_children < 2
            || self.rtree_min_children == 0
            || 2 * self.rtree_min_children > self.rtree_max_children + 1
        {
            return Err(RepositoryError::invalid_option(
                0,
                format!(
                    "R-tree fanout max={} min={} cannot be split",
                    self.rtree_max_children, self.rtree_min_children
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_is_valid() {
        assert!(RepositoryConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = RepositoryConfig::default()
            .with_channel_capacity(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
    }

    #[test]
    fn bad_fanout_is_rejected() {
        let err = RepositoryConfig::default()
            .with_rtree_fanout(4, 3)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert!(RepositoryConfig::default().with_rtree_fanout(4, 2).validate().is_ok());
    }

    #[test]
    fn single_child_fanout_is_rejected() {
        let err = RepositoryConfig::default()
            .with_rtree_fanout(1, 1)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert!(RepositoryConfig::default().with_rtree_fanout(2, 1).validate().is_ok());
    }

    #[test]
    fn json_round_trip_with_defaults() {
        let config = RepositoryConfig::from_json_str(r#"{"channel_capacity": 8}"#).unwrap();
        assert_eq!(config, RepositoryConfig::default().with_channel_capacity(8));
        let err = RepositoryConfig::from_json_str(r#"{"channel_capacity": "lots"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
