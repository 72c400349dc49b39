//! Validation or creation of the column families a mapping needs

use super::definition::ColumnFamilyDefinition;
use super::helper::ColumnFamilyHelper;
use crate::config::DEFAULT_COUNTER_CF;
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::{EntityMeta, PropertyMeta};
use crate::serializer::Serializer;
use crate::store::StoreClient;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves every column family of an entity model against one keyspace.
///
/// The keyspace is described once, on construction. Names created through
/// this creator are remembered so a second pass never creates them again.
pub struct ColumnFamilyCreator {
    store: Arc<dyn StoreClient>,
    keyspace: String,
    definitions: Vec<ColumnFamilyDefinition>,
    created: HashSet<String>,
    counter_column_family: String,
}

impl ColumnFamilyCreator {
    pub fn new(store: Arc<dyn StoreClient>, keyspace: impl Into<String>) -> CfmapResult<Self> {
        let keyspace = keyspace.into();
        let definitions = store.describe_keyspace(&keyspace)?;
        debug!(target: "schema", keyspace = %keyspace, column_families = definitions.len(), "keyspace described");
        Ok(Self {
            store,
            keyspace,
            definitions,
            created: HashSet::new(),
            counter_column_family: DEFAULT_COUNTER_CF.to_string(),
        })
    }

    pub fn with_counter_column_family(mut self, name: impl Into<String>) -> Self {
        self.counter_column_family = name.into();
        self
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Column families created by this creator so far.
    pub fn created_column_families(&self) -> &HashSet<String> {
        &self.created
    }

    pub fn discover_column_family(&self, name: &str) -> Option<&ColumnFamilyDefinition> {
        debug!(target: "schema", column_family = name, "start discovery of column family");
        let found = self.definitions.iter().find(|d| d.name == name);
        if found.is_some() {
            debug!(target: "schema", column_family = name, "existing column family found");
        }
        found
    }

    /// Creates a column family unless this creator already did.
    pub fn add_column_family(&mut self, definition: ColumnFamilyDefinition) -> CfmapResult<()> {
        if !self.created.insert(definition.name.clone()) {
            debug!(target: "schema", column_family = %definition.name, "column family already created");
            return Ok(());
        }
        self.store.add_column_family(&definition)?;
        info!(target: "schema", column_family = %definition.name, keyspace = %self.keyspace, "column family created");
        Ok(())
    }

    pub fn create_column_family(&mut self, meta: &EntityMeta) -> CfmapResult<()> {
        debug!(target: "schema", entity = meta.class_name(), "creating column family for entity");
        let definition = match meta.direct_mapping_property() {
            Some(property) => ColumnFamilyHelper::build_composite_cf(
                &self.keyspace,
                property,
                meta.id_serializer(),
                meta.column_family_name(),
                meta.class_name(),
            )?,
            None => ColumnFamilyHelper::build_dynamic_composite_cf(meta, &self.keyspace),
        };
        self.add_column_family(definition)
    }

    /// Walks each entity's external wide maps, then the entity itself, then
    /// the shared counter column family when any entity has counters.
    pub fn validate_or_create_column_families<'a>(
        &mut self,
        entities: impl IntoIterator<Item = &'a EntityMeta>,
        force_creation: bool,
        has_counter: bool,
    ) -> CfmapResult<()> {
        for meta in entities {
            for property in meta.property_metas().values() {
                if let Some(column_family) = property.external_column_family_name() {
                    // A direct join mapping stores its map in the entity column family.
                    if meta.is_column_family_direct_mapping() && column_family == meta.column_family_name() {
                        continue;
                    }
                    self.validate_or_create_cf_for_external_wide_map(
                        property,
                        meta.id_serializer(),
                        force_creation,
                        column_family,
                        meta.class_name(),
                    )?;
                }
            }
            self.validate_or_create_cf_for_entity(meta, force_creation)?;
        }

        if has_counter {
            self.validate_or_create_cf_for_counter(force_creation)?;
        }
        Ok(())
    }

    pub fn validate_or_create_cf_for_entity(&mut self, meta: &EntityMeta, force_creation: bool) -> CfmapResult<()> {
        match self.discover_column_family(meta.column_family_name()) {
            Some(definition) => ColumnFamilyHelper::validate_cf_with_entity_meta(definition, meta),
            None if force_creation => {
                debug!(target: "schema", entity = meta.class_name(), "force creation of column family for entity");
                self.create_column_family(meta)
            }
            None => Err(CfmapError::InvalidColumnFamily(format!(
                "The required column family '{}' does not exist for entity '{}'",
                meta.column_family_name(),
                meta.class_name()
            ))),
        }
    }

    fn validate_or_create_cf_for_external_wide_map(
        &mut self,
        property: &PropertyMeta,
        id_serializer: Serializer,
        force_creation: bool,
        column_family: &str,
        entity_class: &str,
    ) -> CfmapResult<()> {
        match self.discover_column_family(column_family) {
            Some(definition) => {
                ColumnFamilyHelper::validate_cf_with_property_meta(definition, property, id_serializer)
            }
            None if force_creation => {
                debug!(target: "schema", property = property.name(), "force creation of column family for property");
                let definition = ColumnFamilyHelper::build_composite_cf(
                    &self.keyspace,
                    property,
                    id_serializer,
                    column_family,
                    entity_class,
                )?;
                self.add_column_family(definition)
            }
            None => Err(CfmapError::InvalidColumnFamily(format!(
                "The required column family '{column_family}' does not exist for field '{}'",
                property.name()
            ))),
        }
    }

    fn validate_or_create_cf_for_counter(&mut self, force_creation: bool) -> CfmapResult<()> {
        let name = self.counter_column_family.clone();
        match self.discover_column_family(&name) {
            Some(definition) => ColumnFamilyHelper::validate_counter_cf(definition),
            None if force_creation => {
                debug!(target: "schema", column_family = %name, "force creation of column family for counters");
                let definition = ColumnFamilyHelper::build_counter_cf(&self.keyspace, &name);
                self.add_column_family(definition)
            }
            None => Err(CfmapError::InvalidColumnFamily(format!(
                "The required column family '{name}' does not exist"
            ))),
        }
    }
}
