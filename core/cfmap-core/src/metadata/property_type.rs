//! Property type classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mapping kind of a property. All downstream branching reads these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Simple,
    LazySimple,
    List,
    LazyList,
    Set,
    LazySet,
    Map,
    LazyMap,
    WideMap,
    WideMapCounter,
    Counter,
    JoinSimple,
    JoinWideMap,
    ExternalWideMap,
    ExternalJoinWideMap,
}

impl PropertyType {
    pub const fn is_lazy(self) -> bool {
        !matches!(
            self,
            PropertyType::Simple | PropertyType::List | PropertyType::Set | PropertyType::Map
        )
    }

    pub const fn is_join_column(self) -> bool {
        matches!(
            self,
            PropertyType::JoinSimple | PropertyType::JoinWideMap | PropertyType::ExternalJoinWideMap
        )
    }

    pub const fn is_wide_map(self) -> bool {
        matches!(
            self,
            PropertyType::WideMap
                | PropertyType::WideMapCounter
                | PropertyType::JoinWideMap
                | PropertyType::ExternalWideMap
                | PropertyType::ExternalJoinWideMap
        )
    }

    pub const fn is_external(self) -> bool {
        matches!(
            self,
            PropertyType::ExternalWideMap | PropertyType::ExternalJoinWideMap
        )
    }

    pub const fn is_counter(self) -> bool {
        matches!(self, PropertyType::Counter | PropertyType::WideMapCounter)
    }

    /// Loaded with the entity row, without a dedicated query.
    pub const fn is_eager(self) -> bool {
        !self.is_lazy()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PropertyType::Simple => "SIMPLE",
            PropertyType::LazySimple => "LAZY_SIMPLE",
            PropertyType::List => "LIST",
            PropertyType::LazyList => "LAZY_LIST",
            PropertyType::Set => "SET",
            PropertyType::LazySet => "LAZY_SET",
            PropertyType::Map => "MAP",
            PropertyType::LazyMap => "LAZY_MAP",
            PropertyType::WideMap => "WIDE_MAP",
            PropertyType::WideMapCounter => "WIDE_MAP_COUNTER",
            PropertyType::Counter => "COUNTER",
            PropertyType::JoinSimple => "JOIN_SIMPLE",
            PropertyType::JoinWideMap => "JOIN_WIDE_MAP",
            PropertyType::ExternalWideMap => "EXTERNAL_WIDE_MAP",
            PropertyType::ExternalJoinWideMap => "EXTERNAL_JOIN_WIDE_MAP",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_flags() {
        assert!(!PropertyType::Simple.is_lazy());
        assert!(!PropertyType::Map.is_lazy());
        assert!(PropertyType::LazyList.is_lazy());
        assert!(PropertyType::Counter.is_lazy());
        assert!(PropertyType::JoinSimple.is_lazy());
        assert!(PropertyType::ExternalWideMap.is_lazy());
    }

    #[test]
    fn test_join_and_external_flags() {
        assert!(PropertyType::JoinWideMap.is_join_column());
        assert!(!PropertyType::JoinWideMap.is_external());
        assert!(PropertyType::ExternalJoinWideMap.is_join_column());
        assert!(PropertyType::ExternalJoinWideMap.is_external());
        assert!(!PropertyType::WideMap.is_join_column());
    }

    #[test]
    fn test_wide_map_and_counter_flags() {
        assert!(PropertyType::WideMapCounter.is_wide_map());
        assert!(PropertyType::WideMapCounter.is_counter());
        assert!(PropertyType::Counter.is_counter());
        assert!(!PropertyType::Counter.is_wide_map());
        assert!(!PropertyType::JoinSimple.is_wide_map());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PropertyType::ExternalJoinWideMap).unwrap();
        assert_eq!(json, "\"EXTERNAL_JOIN_WIDE_MAP\"");
        let back: PropertyType = serde_json::from_str("\"LAZY_MAP\"").unwrap();
        assert_eq!(back, PropertyType::LazyMap);
    }
}
