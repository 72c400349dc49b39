//! Scratch state of one entity parse

use super::descriptor::{FieldDescriptor, JoinMarker};
use crate::consistency::ConsistencyLevels;
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::PropertyMeta;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Everything collected while walking the fields of one entity.
///
/// Owned by a single `parse_entity` call and dropped when it returns, so
/// concurrent parses never share it.
#[derive(Debug)]
pub struct ParseContext<'d> {
    class_name: String,
    column_family_name: String,
    direct_mapping: bool,
    consistency: ConsistencyLevels,
    used_names: HashSet<String>,
    pub(crate) id_meta: Option<Arc<PropertyMeta>>,
    pub(crate) property_metas: BTreeMap<String, Arc<PropertyMeta>>,
    /// Wide maps stored in their own column family, with the declared table
    pub(crate) external_wide_maps: Vec<(&'d FieldDescriptor, String)>,
    /// Join wide maps stored in their own column family
    pub(crate) external_join_wide_maps: Vec<(&'d FieldDescriptor, &'d JoinMarker)>,
    pub(crate) counters: Vec<&'d FieldDescriptor>,
    /// Join properties whose target is resolved once every entity is parsed
    pub(crate) join_properties: Vec<Arc<PropertyMeta>>,
    /// Column family levels, registered in the policy once the entity is valid
    pub(crate) column_family_levels: Vec<(String, ConsistencyLevels)>,
}

impl<'d> ParseContext<'d> {
    pub fn new(
        class_name: impl Into<String>,
        column_family_name: impl Into<String>,
        direct_mapping: bool,
        consistency: ConsistencyLevels,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            column_family_name: column_family_name.into(),
            direct_mapping,
            consistency,
            used_names: HashSet::new(),
            id_meta: None,
            property_metas: BTreeMap::new(),
            external_wide_maps: Vec::new(),
            external_join_wide_maps: Vec::new(),
            counters: Vec::new(),
            join_properties: Vec::new(),
            column_family_levels: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn column_family_name(&self) -> &str {
        &self.column_family_name
    }

    pub fn is_direct_mapping(&self) -> bool {
        self.direct_mapping
    }

    /// Entity-level consistency pair.
    pub fn consistency(&self) -> ConsistencyLevels {
        self.consistency
    }

    /// Reserves a property name, failing if a column or join field already
    /// uses it.
    pub fn claim_name(&mut self, name: &str) -> CfmapResult<()> {
        if !self.used_names.insert(name.to_string()) {
            return Err(CfmapError::bean_mapping(format!(
                "The property '{name}' is already used for the entity '{}'",
                self.class_name
            )));
        }
        Ok(())
    }

    /// Records the pair of a column family used by this entity.
    pub fn register_levels(&mut self, column_family: impl Into<String>, levels: ConsistencyLevels) {
        self.column_family_levels.push((column_family.into(), levels));
    }

    pub fn add_property(&mut self, meta: PropertyMeta) -> Arc<PropertyMeta> {
        let meta = Arc::new(meta);
        self.property_metas
            .insert(meta.name().to_string(), Arc::clone(&meta));
        meta
    }

    pub fn add_join_property(&mut self, meta: PropertyMeta) {
        let meta = self.add_property(meta);
        self.join_properties.push(meta);
    }
}
