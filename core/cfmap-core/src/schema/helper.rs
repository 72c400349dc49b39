//! Column family definitions derived from mapping metadata

use super::definition::{ColumnFamilyDefinition, ComparatorType, DefaultValidator};
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::{EntityMeta, PropertyMeta};
use crate::serializer::Serializer;

/// Builds and checks the physical definitions an entity model needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnFamilyHelper;

impl ColumnFamilyHelper {
    /// Entity row column family: id keyed, one dynamic composite column per
    /// simple property or wide-map entry.
    pub fn build_dynamic_composite_cf(meta: &EntityMeta, keyspace: &str) -> ColumnFamilyDefinition {
        ColumnFamilyDefinition {
            keyspace: keyspace.to_string(),
            name: meta.column_family_name().to_string(),
            comparator: ComparatorType::DynamicComposite,
            key_validator: ComparatorType::Simple(meta.id_serializer()),
            default_validator: DefaultValidator::Utf8,
            comment: Some(format!("Column family for entity '{}'", meta.class_name())),
        }
    }

    /// Wide map column family: id keyed, columns named by the map key.
    pub fn build_composite_cf(
        keyspace: &str,
        property: &PropertyMeta,
        id_serializer: Serializer,
        column_family: &str,
        entity_class: &str,
    ) -> CfmapResult<ColumnFamilyDefinition> {
        Ok(ColumnFamilyDefinition {
            keyspace: keyspace.to_string(),
            name: column_family.to_string(),
            comparator: ComparatorType::Composite(Self::key_components(property)?),
            key_validator: ComparatorType::Simple(id_serializer),
            default_validator: DefaultValidator::Bytes,
            comment: Some(format!(
                "Column family for property '{}' of entity '{entity_class}'",
                property.name()
            )),
        })
    }

    /// Shared counter column family, keyed by `(entity class, id)`.
    pub fn build_counter_cf(keyspace: &str, column_family: &str) -> ColumnFamilyDefinition {
        ColumnFamilyDefinition {
            keyspace: keyspace.to_string(),
            name: column_family.to_string(),
            comparator: ComparatorType::DynamicComposite,
            key_validator: Self::counter_key_validator(),
            default_validator: DefaultValidator::Counter,
            comment: Some("Column family for counters".to_string()),
        }
    }

    pub fn validate_cf_with_entity_meta(definition: &ColumnFamilyDefinition, meta: &EntityMeta) -> CfmapResult<()> {
        if let Some(property) = meta.direct_mapping_property() {
            return Self::validate_cf_with_property_meta(definition, property, meta.id_serializer());
        }
        Self::check_key_validator(definition, &ComparatorType::Simple(meta.id_serializer()))?;
        Self::check_comparator(definition, &ComparatorType::DynamicComposite)?;
        Self::check_not_counter(definition)?;
        tracing::debug!(target: "schema", column_family = %definition.name, entity = meta.class_name(), "column family validated");
        Ok(())
    }

    pub fn validate_cf_with_property_meta(
        definition: &ColumnFamilyDefinition,
        property: &PropertyMeta,
        id_serializer: Serializer,
    ) -> CfmapResult<()> {
        Self::check_key_validator(definition, &ComparatorType::Simple(id_serializer))?;
        Self::check_comparator(definition, &ComparatorType::Composite(Self::key_components(property)?))?;
        Self::check_not_counter(definition)?;
        tracing::debug!(target: "schema", column_family = %definition.name, property = property.name(), "column family validated");
        Ok(())
    }

    pub fn validate_counter_cf(definition: &ColumnFamilyDefinition) -> CfmapResult<()> {
        Self::check_key_validator(definition, &Self::counter_key_validator())?;
        Self::check_comparator(definition, &ComparatorType::DynamicComposite)?;
        if definition.default_validator != DefaultValidator::Counter {
            return Err(CfmapError::InvalidColumnFamily(format!(
                "The column family '{}' default validator should be '{}'",
                definition.name,
                DefaultValidator::Counter
            )));
        }
        Ok(())
    }

    fn counter_key_validator() -> ComparatorType {
        ComparatorType::Composite(vec![Serializer::Utf8, Serializer::Utf8])
    }

    /// Comparator components of a wide map: its key, or each multi-key
    /// component in order.
    fn key_components(property: &PropertyMeta) -> CfmapResult<Vec<Serializer>> {
        if let Some(multi_key) = property.multi_key_properties() {
            return Ok(multi_key.component_serializers().to_vec());
        }
        property.key_serializer().map(|s| vec![s]).ok_or_else(|| {
            CfmapError::bean_mapping(format!("The property '{}' is not a wide map", property.name()))
        })
    }

    fn check_key_validator(definition: &ColumnFamilyDefinition, expected: &ComparatorType) -> CfmapResult<()> {
        if &definition.key_validator != expected {
            return Err(CfmapError::InvalidColumnFamily(format!(
                "The column family '{}' key validator '{}' does not correspond to the expected key type '{expected}'",
                definition.name, definition.key_validator
            )));
        }
        Ok(())
    }

    fn check_comparator(definition: &ColumnFamilyDefinition, expected: &ComparatorType) -> CfmapResult<()> {
        if &definition.comparator != expected {
            return Err(CfmapError::InvalidColumnFamily(format!(
                "The column family '{}' comparator type '{}' should be '{expected}'",
                definition.name, definition.comparator
            )));
        }
        Ok(())
    }

    fn check_not_counter(definition: &ColumnFamilyDefinition) -> CfmapResult<()> {
        if definition.default_validator == DefaultValidator::Counter {
            return Err(CfmapError::InvalidColumnFamily(format!(
                "The column family '{}' holds counters and cannot store entity values",
                definition.name
            )));
        }
        Ok(())
    }
}
