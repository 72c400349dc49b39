//! Error types for the cfmap mapping layer.
//!
//! All public APIs return `CfmapResult<T>`. Messages of the mapping and
//! schema variants are stable: callers and tests match on the exact text.

use thiserror::Error;

/// Unified error type for all cfmap operations.
#[derive(Debug, Error)]
pub enum CfmapError {
    /// Entity or property mapping rule violated at parse time
    #[error("{0}")]
    BeanMapping(String),

    /// Column family missing or incompatible with the mapping
    #[error("{0}")]
    InvalidColumnFamily(String),

    /// Value or component does not match the declared type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Argument or naming rule violated
    #[error("{0}")]
    Validation(String),

    /// Failure reported by the underlying store client
    #[error("store error: {0}")]
    Store(String),

    /// Operation not supported for this kind of property
    #[error("{0}")]
    Unsupported(String),

    /// Cursor exhausted
    #[error("no more elements")]
    NoSuchElement,

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Result type alias for all cfmap operations.
pub type CfmapResult<T> = Result<T, CfmapError>;

impl CfmapError {
    /// Mapping error helper.
    pub fn bean_mapping(message: impl Into<String>) -> Self {
        CfmapError::BeanMapping(message.into())
    }

    /// Column family error helper.
    pub fn invalid_column_family(message: impl Into<String>) -> Self {
        CfmapError::InvalidColumnFamily(message.into())
    }

    /// Type mismatch helper.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        CfmapError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wraps any store-side failure.
    pub fn store(message: impl std::fmt::Display) -> Self {
        CfmapError::Store(message.to_string())
    }
}

impl From<serde_json::Error> for CfmapError {
    fn from(err: serde_json::Error) -> Self {
        CfmapError::Serialization(err.to_string())
    }
}

impl From<uuid::Error> for CfmapError {
    fn from(err: uuid::Error) -> Self {
        CfmapError::type_mismatch("uuid", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bean_mapping_message_is_verbatim() {
        let err = CfmapError::bean_mapping("The entity 'Bean' should have at least one field");
        assert_eq!(
            err.to_string(),
            "The entity 'Bean' should have at least one field"
        );
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = CfmapError::type_mismatch("long (8 bytes)", "3 bytes");
        assert_eq!(
            err.to_string(),
            "type mismatch: expected long (8 bytes), got 3 bytes"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i64>("not a number").unwrap_err();
        let err: CfmapError = json_err.into();
        assert!(matches!(err, CfmapError::Serialization(_)));
    }

    #[test]
    fn test_store_wraps_display() {
        let err = CfmapError::store("unconfigured columnfamily users");
        assert_eq!(err.to_string(), "store error: unconfigured columnfamily users");
    }
}
