//! Field classification into property metadata

use super::context::ParseContext;
use super::descriptor::{ColumnMarker, FieldDescriptor, FieldShape, JoinMarker};
use crate::consistency::ConsistencyPolicy;
use crate::dao::{CounterDao, GenericCompositeDao};
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::{
    CounterProperties, ExternalWideMapProperties, JoinProperties, MultiKeyProperties, PropertyMeta,
    PropertyMetaBuilder, PropertyType,
};
use crate::schema::normalize_and_validate_cf_name;
use crate::serializer::Serializer;
use crate::store::StoreClient;
use crate::value::{KeyComponent, ValueKind};
use std::sync::Arc;
use tracing::trace;

/// Turns field descriptors into [`PropertyMeta`]s.
///
/// Wide maps in their own column family and counters need the id metadata,
/// so the first pass only records them in the [`ParseContext`] and the
/// `fill_*` methods finish them.
pub struct PropertyParser {
    store: Arc<dyn StoreClient>,
    policy: Arc<ConsistencyPolicy>,
    counter_dao: Arc<CounterDao>,
}

impl PropertyParser {
    pub fn new(store: Arc<dyn StoreClient>, policy: Arc<ConsistencyPolicy>, counter_dao: Arc<CounterDao>) -> Self {
        Self {
            store,
            policy,
            counter_dao,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    pub(crate) fn policy(&self) -> &Arc<ConsistencyPolicy> {
        &self.policy
    }

    pub(crate) fn counter_dao(&self) -> &Arc<CounterDao> {
        &self.counter_dao
    }

    pub fn parse_id(&self, field: &FieldDescriptor, ctx: &ParseContext<'_>) -> CfmapResult<PropertyMeta> {
        let FieldShape::Scalar(kind) = field.shape() else {
            return Err(CfmapError::bean_mapping(format!(
                "Value of '{}' should be Serializable",
                field.field_name()
            )));
        };
        if !kind.is_native() {
            return Err(CfmapError::bean_mapping(format!(
                "Value of '{}' should be Serializable",
                field.field_name()
            )));
        }
        self.base(field, field.field_name(), ctx)
            .value_kind(kind.clone())
            .build(PropertyType::Simple)
    }

    pub fn parse_column<'d>(
        &self,
        field: &'d FieldDescriptor,
        column: &ColumnMarker,
        ctx: &mut ParseContext<'d>,
    ) -> CfmapResult<()> {
        let name = field.property_name();
        ctx.claim_name(name)?;

        if field.is_counter() {
            if field.shape().value_kind() != &ValueKind::Long
                || !matches!(field.shape(), FieldShape::Scalar(_) | FieldShape::WideMap { .. })
            {
                return Err(CfmapError::bean_mapping(format!(
                    "Wrong counter type for the field '{}'. Only i64 is allowed for #[cfmap(counter)] types",
                    field.field_name()
                )));
            }
            ctx.counters.push(field);
            return Ok(());
        }

        let lazy = field.is_lazy();
        let builder = self.base(field, name, ctx);
        let (builder, property_type) = match field.shape() {
            FieldShape::Scalar(kind) => (
                builder.value_kind(kind.clone()),
                if lazy { PropertyType::LazySimple } else { PropertyType::Simple },
            ),
            FieldShape::List(kind) => (
                builder.value_kind(kind.clone()),
                if lazy { PropertyType::LazyList } else { PropertyType::List },
            ),
            FieldShape::Set(kind) => (
                builder.value_kind(kind.clone()),
                if lazy { PropertyType::LazySet } else { PropertyType::Set },
            ),
            FieldShape::Map { key, value } => (
                builder.key_kind(key.clone()).value_kind(value.clone()),
                if lazy { PropertyType::LazyMap } else { PropertyType::Map },
            ),
            FieldShape::WideMap { .. } => {
                if let Some(table) = &column.table {
                    ctx.external_wide_maps.push((field, table.clone()));
                    return Ok(());
                }
                (self.wide_map(builder, field.shape())?, PropertyType::WideMap)
            }
        };

        let meta = builder.build(property_type)?;
        trace!(target: "parser", entity = ctx.class_name(), property = name, property_type = %property_type, "column parsed");
        ctx.add_property(meta);
        Ok(())
    }

    pub fn parse_join<'d>(
        &self,
        field: &'d FieldDescriptor,
        join: &'d JoinMarker,
        ctx: &mut ParseContext<'d>,
    ) -> CfmapResult<()> {
        let name = field.property_name();
        ctx.claim_name(name)?;
        let target = Self::join_target(field, ctx)?;

        let builder = self.base(field, name, ctx).join(JoinProperties::new(target, join.cascade.iter().copied()));
        let (builder, property_type) = match field.shape() {
            FieldShape::Scalar(kind) => (builder.value_kind(kind.clone()), PropertyType::JoinSimple),
            FieldShape::WideMap { .. } => {
                if join.table.is_some() || ctx.is_direct_mapping() {
                    ctx.external_join_wide_maps.push((field, join));
                    return Ok(());
                }
                (self.wide_map(builder, field.shape())?, PropertyType::JoinWideMap)
            }
            _ => {
                return Err(CfmapError::bean_mapping(format!(
                    "The join property '{name}' of entity '{}' should be a single entity or a WideMap of entities",
                    ctx.class_name()
                )));
            }
        };

        let meta = builder.build(property_type)?;
        trace!(target: "parser", entity = ctx.class_name(), property = name, property_type = %property_type, "join column parsed");
        ctx.add_join_property(meta);
        Ok(())
    }

    /// Completes a wide map stored in its own column family, with its DAO.
    pub fn fill_external_wide_map(
        &self,
        field: &FieldDescriptor,
        table: &str,
        id_meta: &PropertyMeta,
        ctx: &mut ParseContext<'_>,
    ) -> CfmapResult<()> {
        let column_family = normalize_and_validate_cf_name(table)?;
        let id_serializer = id_meta.value_serializer();
        let levels = field.consistency_levels().unwrap_or(ctx.consistency());
        ctx.register_levels(column_family.clone(), levels);

        let builder = self.wide_map(self.base(field, field.property_name(), ctx), field.shape())?;
        let value_serializer = Serializer::for_kind(field.shape().value_kind());
        let dao = GenericCompositeDao::new(
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            column_family.clone(),
            id_serializer,
            value_serializer,
        );
        let external = ExternalWideMapProperties::new(column_family, id_serializer).with_dao(Arc::new(dao));
        let meta = builder.external(external).build(PropertyType::ExternalWideMap)?;
        trace!(target: "parser", entity = ctx.class_name(), property = meta.name(), "external wide map filled");
        ctx.add_property(meta);
        Ok(())
    }

    /// Completes a join wide map stored in its own column family. A direct
    /// mapping stores it in the entity column family. The DAO waits for
    /// the join target's id type.
    pub fn fill_external_join_wide_map(
        &self,
        field: &FieldDescriptor,
        join: &JoinMarker,
        id_meta: &PropertyMeta,
        ctx: &mut ParseContext<'_>,
    ) -> CfmapResult<()> {
        let column_family = match &join.table {
            Some(table) if !ctx.is_direct_mapping() => normalize_and_validate_cf_name(table)?,
            _ => ctx.column_family_name().to_string(),
        };
        let levels = field.consistency_levels().unwrap_or(ctx.consistency());
        ctx.register_levels(column_family.clone(), levels);

        let target = Self::join_target(field, ctx)?;
        let meta = self
            .wide_map(self.base(field, field.property_name(), ctx), field.shape())?
            .join(JoinProperties::new(target, join.cascade.iter().copied()))
            .external(ExternalWideMapProperties::new(column_family, id_meta.value_serializer()))
            .build(PropertyType::ExternalJoinWideMap)?;
        trace!(target: "parser", entity = ctx.class_name(), property = meta.name(), "external join wide map filled");
        ctx.add_join_property(meta);
        Ok(())
    }

    /// Completes a counter with the entity id, bound to the shared counter
    /// DAO or to a copy carrying the property's own consistency pair.
    pub fn fill_counter(
        &self,
        field: &FieldDescriptor,
        id_meta: &Arc<PropertyMeta>,
        ctx: &mut ParseContext<'_>,
    ) -> CfmapResult<()> {
        let dao = match field.consistency_levels() {
            Some(levels) => Arc::new(self.counter_dao.with_levels(levels)),
            None => Arc::clone(&self.counter_dao),
        };
        let counter = CounterProperties::new(ctx.class_name(), dao, Arc::clone(id_meta));
        let builder = self.base(field, field.property_name(), ctx).counter(counter);
        let meta = match field.shape() {
            FieldShape::WideMap { .. } => self
                .wide_map(builder, field.shape())?
                .build(PropertyType::WideMapCounter)?,
            shape => builder
                .value_kind(shape.value_kind().clone())
                .build(PropertyType::Counter)?,
        };
        trace!(target: "parser", entity = ctx.class_name(), property = meta.name(), "counter filled");
        ctx.add_property(meta);
        Ok(())
    }

    fn base(&self, field: &FieldDescriptor, name: &str, ctx: &ParseContext<'_>) -> PropertyMetaBuilder {
        PropertyMeta::builder(name)
            .entity_class(ctx.class_name())
            .accessors(field.field_accessors().cloned())
            .consistency(Some(field.consistency_levels().unwrap_or(ctx.consistency())))
    }

    fn wide_map(&self, builder: PropertyMetaBuilder, shape: &FieldShape) -> CfmapResult<PropertyMetaBuilder> {
        let FieldShape::WideMap {
            key,
            key_components,
            value,
        } = shape
        else {
            return Ok(builder);
        };
        Ok(builder
            .key_kind(key.clone())
            .value_kind(value.clone())
            .multi_key(Self::multi_key(key, key_components.as_deref())?))
    }

    fn multi_key(key: &ValueKind, components: Option<&[KeyComponent]>) -> CfmapResult<Option<MultiKeyProperties>> {
        let Some(components) = components else {
            return Ok(None);
        };
        let type_name = match key {
            ValueKind::MultiKey(name) => name.clone(),
            other => other.name(),
        };
        MultiKeyProperties::from_components(type_name, components.to_vec()).map(Some)
    }

    fn join_target(field: &FieldDescriptor, ctx: &ParseContext<'_>) -> CfmapResult<String> {
        match field.shape().value_kind() {
            ValueKind::Entity(target) => Ok(target.clone()),
            _ => Err(CfmapError::bean_mapping(format!(
                "The join property '{}' of entity '{}' should reference an entity type",
                field.property_name(),
                ctx.class_name()
            ))),
        }
    }
}
