//! Mapping configuration
//!
//! Loaded from JSON, from `CFMAP_*` environment variables, or assembled with
//! the `with_*` builders.

use crate::consistency::{ConsistencyLevel, ConsistencyLevels};
use crate::dao::DEFAULT_LENGTH;
use crate::error::{CfmapError, CfmapResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Default name of the shared counter column family.
pub const DEFAULT_COUNTER_CF: &str = "cfmap_counters";

pub const ENV_KEYSPACE: &str = "CFMAP_KEYSPACE";
pub const ENV_FORCE_CF_CREATION: &str = "CFMAP_FORCE_CF_CREATION";
pub const ENV_READ_CONSISTENCY: &str = "CFMAP_READ_CONSISTENCY";
pub const ENV_WRITE_CONSISTENCY: &str = "CFMAP_WRITE_CONSISTENCY";
pub const ENV_SLICE_PAGE_SIZE: &str = "CFMAP_SLICE_PAGE_SIZE";

/// Session-wide mapping settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub keyspace: String,
    pub force_column_family_creation: bool,
    pub default_read_consistency: ConsistencyLevel,
    pub default_write_consistency: ConsistencyLevel,
    /// Columns fetched per page by slice iterators
    pub slice_page_size: usize,
    pub counter_column_family: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            keyspace: "cfmap".to_string(),
            force_column_family_creation: false,
            default_read_consistency: ConsistencyLevel::One,
            default_write_consistency: ConsistencyLevel::One,
            slice_page_size: DEFAULT_LENGTH,
            counter_column_family: DEFAULT_COUNTER_CF.to_string(),
        }
    }
}

impl MappingConfig {
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> CfmapResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> CfmapResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults overridden by the `CFMAP_*` environment variables.
    pub fn from_env() -> CfmapResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CfmapResult<Self> {
        let mut config = Self::default();
        if let Some(keyspace) = lookup(ENV_KEYSPACE) {
            config.keyspace = keyspace;
        }
        if let Some(value) = lookup(ENV_FORCE_CF_CREATION) {
            config.force_column_family_creation = value.eq_ignore_ascii_case("true") || value == "1";
        }
        if let Some(value) = lookup(ENV_READ_CONSISTENCY) {
            config.default_read_consistency = value.parse()?;
        }
        if let Some(value) = lookup(ENV_WRITE_CONSISTENCY) {
            config.default_write_consistency = value.parse()?;
        }
        if let Some(value) = lookup(ENV_SLICE_PAGE_SIZE) {
            config.slice_page_size = value
                .parse()
                .map_err(|_| CfmapError::Config(format!("{ENV_SLICE_PAGE_SIZE} should be a positive integer, got '{value}'")))?;
        }
        config.validate()
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    pub fn with_force_column_family_creation(mut self, force: bool) -> Self {
        self.force_column_family_creation = force;
        self
    }

    pub fn with_default_consistency(mut self, read: ConsistencyLevel, write: ConsistencyLevel) -> Self {
        self.default_read_consistency = read;
        self.default_write_consistency = write;
        self
    }

    pub fn with_slice_page_size(mut self, size: usize) -> Self {
        self.slice_page_size = size;
        self
    }

    pub fn with_counter_column_family(mut self, name: impl Into<String>) -> Self {
        self.counter_column_family = name.into();
        self
    }

    pub fn default_consistency(&self) -> ConsistencyLevels {
        ConsistencyLevels::new(self.default_read_consistency, self.default_write_consistency)
    }

    pub fn validate(self) -> CfmapResult<Self> {
        if self.keyspace.is_empty() {
            return Err(CfmapError::Config("keyspace should not be empty".to_string()));
        }
        if self.slice_page_size == 0 {
            return Err(CfmapError::Config("slice_page_size should be at least 1".to_string()));
        }
        if self.counter_column_family.is_empty() {
            return Err(CfmapError::Config("counter_column_family should not be empty".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MappingConfig::default();
        assert_eq!(config.slice_page_size, 50);
        assert_eq!(config.counter_column_family, "cfmap_counters");
        assert!(!config.force_column_family_creation);
        assert_eq!(
            config.default_consistency(),
            ConsistencyLevels::new(ConsistencyLevel::One, ConsistencyLevel::One)
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MappingConfig::from_json_str(
            r#"{"keyspace": "app", "default_write_consistency": "QUORUM"}"#,
        )
        .unwrap();
        assert_eq!(config.keyspace, "app");
        assert_eq!(config.default_write_consistency, ConsistencyLevel::Quorum);
        assert_eq!(config.slice_page_size, 50);
    }

    #[test]
    fn test_env_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_KEYSPACE, "events"),
            (ENV_FORCE_CF_CREATION, "TRUE"),
            (ENV_READ_CONSISTENCY, "local_quorum"),
            (ENV_SLICE_PAGE_SIZE, "20"),
        ]
        .into_iter()
        .collect();
        let config = MappingConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.keyspace, "events");
        assert!(config.force_column_family_creation);
        assert_eq!(config.default_read_consistency, ConsistencyLevel::LocalQuorum);
        assert_eq!(config.default_write_consistency, ConsistencyLevel::One);
        assert_eq!(config.slice_page_size, 20);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = MappingConfig::from_lookup(|name| (name == ENV_SLICE_PAGE_SIZE).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, CfmapError::Config(_)));
        let err = MappingConfig::from_lookup(|name| (name == ENV_WRITE_CONSISTENCY).then(|| "SOME".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "config error: unknown consistency level 'SOME'");
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfmap.json");
        std::fs::write(&path, r#"{"keyspace": "files", "force_column_family_creation": true}"#).unwrap();
        let config = MappingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.keyspace, "files");
        assert!(config.force_column_family_creation);

        let missing = MappingConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, CfmapError::Io { .. }));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(MappingConfig::default().with_slice_page_size(0).validate().is_err());
    }
}
