//! Entity parsing
//!
//! Turns [`EntityDescriptor`]s into [`EntityMeta`]s in two steps: each
//! entity on its own with [`EntityParser::parse_entity`], then join targets
//! across all of them with [`EntityParser::fill_join_entity_meta`].

mod context;
mod descriptor;
mod property;

pub use context::ParseContext;
pub use descriptor::{
    ColumnMarker, Entity, EntityDescriptor, FieldDescriptor, FieldMarker, FieldShape, JoinMarker, WideMap,
};
pub use property::PropertyParser;

use crate::consistency::ConsistencyPolicy;
use crate::dao::{CounterDao, GenericCompositeDao};
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::{EntityMeta, PropertyMeta, PropertyType};
use crate::schema::normalize_and_validate_cf_name;
use crate::store::StoreClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Builds entity metadata from descriptors.
pub struct EntityParser {
    properties: PropertyParser,
}

impl EntityParser {
    pub fn new(store: Arc<dyn StoreClient>, policy: Arc<ConsistencyPolicy>, counter_dao: Arc<CounterDao>) -> Self {
        Self {
            properties: PropertyParser::new(store, policy, counter_dao),
        }
    }

    /// Parses one entity. Join properties are appended to `pending_joins`
    /// for [`fill_join_entity_meta`](Self::fill_join_entity_meta).
    pub fn parse_entity(
        &self,
        descriptor: &EntityDescriptor,
        pending_joins: &mut Vec<Arc<PropertyMeta>>,
    ) -> CfmapResult<EntityMeta> {
        let class_name = descriptor.class_name();
        debug!(target: "parser", entity = class_name, "parsing entity");

        let column_family_name =
            normalize_and_validate_cf_name(descriptor.table_name().unwrap_or(descriptor.simple_name()))?;
        let policy = self.properties.policy();
        let consistency = descriptor.consistency_levels().unwrap_or_else(|| policy.defaults());

        let direct_mapping = descriptor.is_column_family_direct_mapping();
        let mut ctx = ParseContext::new(class_name, column_family_name.clone(), direct_mapping, consistency);
        ctx.register_levels(column_family_name.clone(), consistency);

        for field in descriptor.all_fields() {
            match field.marker() {
                FieldMarker::Id => {
                    if ctx.id_meta.is_some() {
                        return Err(CfmapError::bean_mapping(format!(
                            "The entity '{class_name}' should have only one field with #[cfmap(id)] annotation"
                        )));
                    }
                    ctx.id_meta = Some(Arc::new(self.properties.parse_id(field, &ctx)?));
                }
                FieldMarker::Column(column) => self.properties.parse_column(field, column, &mut ctx)?,
                FieldMarker::JoinColumn(join) => self.properties.parse_join(field, join, &mut ctx)?,
            }
        }

        let id_meta = ctx.id_meta.clone().ok_or_else(|| {
            CfmapError::bean_mapping(format!(
                "The entity '{class_name}' should have at least one field with #[cfmap(id)] annotation"
            ))
        })?;

        for (field, table) in std::mem::take(&mut ctx.external_wide_maps) {
            self.properties.fill_external_wide_map(field, &table, &id_meta, &mut ctx)?;
        }
        for (field, join) in std::mem::take(&mut ctx.external_join_wide_maps) {
            self.properties.fill_external_join_wide_map(field, join, &id_meta, &mut ctx)?;
        }
        let has_counter = !ctx.counters.is_empty();
        for field in std::mem::take(&mut ctx.counters) {
            self.properties.fill_counter(field, &id_meta, &mut ctx)?;
        }

        Self::validate_property_metas(&ctx)?;
        Self::validate_column_family_direct_mapping(&ctx)?;

        let counter_dao = has_counter.then(|| Arc::clone(self.properties.counter_dao()));
        let property_count = ctx.property_metas.len();
        let meta = EntityMeta::builder(class_name)
            .column_family_name(column_family_name)
            .serial_version_uid(descriptor.serial_version_uid_value())
            .id_meta(id_meta)
            .property_metas(std::mem::take(&mut ctx.property_metas))
            .column_family_direct_mapping(direct_mapping)
            .counter_dao(counter_dao)
            .consistency(consistency)
            .build(Arc::clone(self.properties.store()), Arc::clone(policy))?;

        for (column_family, levels) in std::mem::take(&mut ctx.column_family_levels) {
            policy.set_levels_for(&column_family, levels);
        }
        pending_joins.append(&mut ctx.join_properties);
        debug!(target: "parser", entity = class_name, properties = property_count, direct_mapping, "entity parsed");
        Ok(meta)
    }

    /// Resolves every pending join property against the parsed entities
    /// and creates the DAOs of external join wide maps.
    pub fn fill_join_entity_meta(
        &self,
        pending_joins: &[Arc<PropertyMeta>],
        entity_metas: &HashMap<String, Arc<EntityMeta>>,
    ) -> CfmapResult<()> {
        for property in pending_joins {
            let Some(join) = property.join_properties() else {
                continue;
            };
            let target_class = join.target_class();
            let target = entity_metas.get(target_class).ok_or_else(|| {
                CfmapError::bean_mapping(format!("Cannot find mapping for join entity '{target_class}'"))
            })?;
            if target.is_column_family_direct_mapping() {
                return Err(CfmapError::bean_mapping(format!(
                    "The entity '{target_class}' is a direct Column Family mapping and cannot be a join entity"
                )));
            }
            join.resolve(target);

            if let Some(external) = property.external_properties() {
                let dao = GenericCompositeDao::new(
                    Arc::clone(self.properties.store()),
                    Arc::clone(self.properties.policy()),
                    external.column_family_name(),
                    external.id_serializer(),
                    target.id_serializer(),
                );
                external.set_dao(Arc::new(dao));
            }
            trace!(target: "parser", property = property.name(), join_entity = target_class, "join entity resolved");
        }
        Ok(())
    }

    fn validate_property_metas(ctx: &ParseContext<'_>) -> CfmapResult<()> {
        if ctx.property_metas.is_empty() {
            return Err(CfmapError::bean_mapping(format!(
                "The entity '{}' should have at least one field with #[cfmap(column)] or #[cfmap(join_column)] annotations",
                ctx.class_name()
            )));
        }
        Ok(())
    }

    fn validate_column_family_direct_mapping(ctx: &ParseContext<'_>) -> CfmapResult<()> {
        if !ctx.is_direct_mapping() {
            return Ok(());
        }
        if ctx.property_metas.len() > 1 {
            return Err(CfmapError::bean_mapping(format!(
                "The ColumnFamily entity '{}' should not have more than one property annotated with #[cfmap(column)]",
                ctx.class_name()
            )));
        }
        let direct_type = ctx.property_metas.values().next().map(|p| p.property_type());
        if !matches!(
            direct_type,
            Some(PropertyType::WideMap | PropertyType::ExternalJoinWideMap)
        ) {
            return Err(CfmapError::bean_mapping(format!(
                "The ColumnFamily entity '{}' should have one and only one #[cfmap(column)]/#[cfmap(join_column)] of type WideMap",
                ctx.class_name()
            )));
        }
        Ok(())
    }
}
