//! Physical column family definitions

use crate::error::{CfmapError, CfmapResult};
use crate::serializer::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest column family name the store accepts.
pub const MAX_CF_NAME_LENGTH: usize = 48;

/// Comparator or key validator of a column family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparatorType {
    Simple(Serializer),
    Composite(Vec<Serializer>),
    DynamicComposite,
}

impl ComparatorType {
    /// Store-side type name, e.g. `CompositeType(LongType,UTF8Type)`.
    pub fn type_name(&self) -> String {
        match self {
            ComparatorType::Simple(serializer) => serializer.comparator_type_name().to_string(),
            ComparatorType::Composite(components) => {
                let names: Vec<_> = components.iter().map(|s| s.comparator_type_name()).collect();
                format!("CompositeType({})", names.join(","))
            }
            ComparatorType::DynamicComposite => {
                let mut aliases: Vec<_> = Serializer::aliased()
                    .map(|(alias, s)| format!("{}=>{}", alias as char, s.comparator_type_name()))
                    .collect();
                aliases.sort();
                format!("DynamicCompositeType({})", aliases.join(","))
            }
        }
    }
}

impl fmt::Display for ComparatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// Default validator of column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultValidator {
    Counter,
    Bytes,
    Utf8,
}

impl DefaultValidator {
    pub fn type_name(&self) -> &'static str {
        match self {
            DefaultValidator::Counter => "CounterColumnType",
            DefaultValidator::Bytes => "BytesType",
            DefaultValidator::Utf8 => "UTF8Type",
        }
    }
}

impl fmt::Display for DefaultValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One column family as known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamilyDefinition {
    pub keyspace: String,
    pub name: String,
    pub comparator: ComparatorType,
    pub key_validator: ComparatorType,
    pub default_validator: DefaultValidator,
    pub comment: Option<String>,
}

/// Maps a class or table name onto the column family naming rules.
///
/// Path separators and generic punctuation become `_`, and only the last
/// 48 characters are kept.
pub fn normalize_and_validate_cf_name(name: &str) -> CfmapResult<String> {
    let normalized = name
        .replace("::", "_")
        .replace(['.', '<', '>', ',', ' '], "_");
    let skip = normalized.chars().count().saturating_sub(MAX_CF_NAME_LENGTH);
    let normalized: String = normalized.chars().skip(skip).collect();

    let valid = !normalized.is_empty()
        && normalized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(CfmapError::Validation(format!(
            "The column family name '{normalized}' is invalid. It should respect the pattern [a-zA-Z0-9_] and be at most {MAX_CF_NAME_LENGTH} characters long"
        )));
    }
    tracing::trace!(target: "schema", raw = name, column_family = %normalized, "normalized column family name");
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_and_generics() {
        assert_eq!(normalize_and_validate_cf_name("app::model::User").unwrap(), "app_model_User");
        assert_eq!(normalize_and_validate_cf_name("parser.entity.Bean").unwrap(), "parser_entity_Bean");
        assert_eq!(normalize_and_validate_cf_name("Pair<i64, String>").unwrap(), "Pair_i64__String_");
    }

    #[test]
    fn test_normalize_keeps_last_48_chars() {
        let long = format!("{}Tail", "a".repeat(60));
        let cf = normalize_and_validate_cf_name(&long).unwrap();
        assert_eq!(cf.len(), 48);
        assert!(cf.ends_with("Tail"));
    }

    #[test]
    fn test_normalize_rejects_invalid_chars() {
        let err = normalize_and_validate_cf_name("user-events").unwrap_err();
        assert!(matches!(err, CfmapError::Validation(_)));
        assert!(err.to_string().contains("'user-events'"));
        assert!(normalize_and_validate_cf_name("").is_err());
    }

    #[test]
    fn test_comparator_type_names() {
        assert_eq!(ComparatorType::Simple(Serializer::Long).type_name(), "LongType");
        assert_eq!(
            ComparatorType::Composite(vec![Serializer::Long, Serializer::Utf8]).type_name(),
            "CompositeType(LongType,UTF8Type)"
        );
        let dynamic = ComparatorType::DynamicComposite.type_name();
        assert!(dynamic.starts_with("DynamicCompositeType("));
        assert!(dynamic.contains("s=>UTF8Type"));
        assert_eq!(DefaultValidator::Counter.to_string(), "CounterColumnType");
    }
}
