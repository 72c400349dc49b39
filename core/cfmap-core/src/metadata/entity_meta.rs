//! Per-entity mapping metadata

use super::property_meta::PropertyMeta;
use crate::consistency::{ConsistencyLevels, ConsistencyPolicy};
use crate::dao::{CounterDao, GenericCompositeDao, GenericDynamicCompositeDao};
use crate::error::{CfmapError, CfmapResult};
use crate::serializer::Serializer;
use crate::store::StoreClient;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// DAO of an entity's own column family.
#[derive(Debug, Clone)]
pub enum EntityDao {
    /// Regular entity: one row per instance, dynamic composite columns
    DynamicComposite(Arc<GenericDynamicCompositeDao>),
    /// Direct column-family mapping: the single wide map is the row
    Composite(Arc<GenericCompositeDao>),
}

impl EntityDao {
    pub fn column_family(&self) -> &str {
        match self {
            EntityDao::DynamicComposite(dao) => dao.column_family(),
            EntityDao::Composite(dao) => dao.column_family(),
        }
    }
}

/// Mapping metadata of one entity type.
pub struct EntityMeta {
    class_name: String,
    column_family_name: String,
    serial_version_uid: Option<i64>,
    id_meta: Arc<PropertyMeta>,
    property_metas: BTreeMap<String, Arc<PropertyMeta>>,
    column_family_direct_mapping: bool,
    counter_dao: Option<Arc<CounterDao>>,
    consistency: ConsistencyLevels,
    dao: Option<EntityDao>,
}

impl EntityMeta {
    pub fn builder(class_name: impl Into<String>) -> EntityMetaBuilder {
        EntityMetaBuilder::new(class_name)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn column_family_name(&self) -> &str {
        &self.column_family_name
    }

    pub fn serial_version_uid(&self) -> Option<i64> {
        self.serial_version_uid
    }

    pub fn id_meta(&self) -> &Arc<PropertyMeta> {
        &self.id_meta
    }

    pub fn id_serializer(&self) -> Serializer {
        self.id_meta.value_serializer()
    }

    /// Mapped properties by name, the id excluded.
    pub fn property_metas(&self) -> &BTreeMap<String, Arc<PropertyMeta>> {
        &self.property_metas
    }

    pub fn property_meta(&self, name: &str) -> Option<&Arc<PropertyMeta>> {
        self.property_metas.get(name)
    }

    pub fn is_column_family_direct_mapping(&self) -> bool {
        self.column_family_direct_mapping
    }

    pub fn has_counter(&self) -> bool {
        self.property_metas.values().any(|p| p.is_counter())
    }

    pub fn counter_dao(&self) -> Option<&Arc<CounterDao>> {
        self.counter_dao.as_ref()
    }

    pub fn consistency_levels(&self) -> ConsistencyLevels {
        self.consistency
    }

    /// DAO of the entity's column family.
    ///
    /// A direct mapping of a join wide map shares the external DAO of its
    /// property, which only exists once the join target is resolved.
    pub fn dao(&self) -> Option<EntityDao> {
        if let Some(dao) = &self.dao {
            return Some(dao.clone());
        }
        self.direct_mapping_property()
            .and_then(|p| p.external_dao())
            .map(|dao| EntityDao::Composite(Arc::clone(dao)))
    }

    /// The single wide map of a direct column-family mapping.
    pub fn direct_mapping_property(&self) -> Option<&Arc<PropertyMeta>> {
        if !self.column_family_direct_mapping {
            return None;
        }
        self.property_metas.values().next()
    }
}

impl fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("class_name", &self.class_name)
            .field("column_family_name", &self.column_family_name)
            .field("serial_version_uid", &self.serial_version_uid)
            .field("id", &self.id_meta.name())
            .field("properties", &self.property_metas.keys().collect::<Vec<_>>())
            .field("column_family_direct_mapping", &self.column_family_direct_mapping)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

/// Assembles an [`EntityMeta`] and its DAO.
pub struct EntityMetaBuilder {
    class_name: String,
    column_family_name: Option<String>,
    serial_version_uid: Option<i64>,
    id_meta: Option<Arc<PropertyMeta>>,
    property_metas: BTreeMap<String, Arc<PropertyMeta>>,
    column_family_direct_mapping: bool,
    counter_dao: Option<Arc<CounterDao>>,
    consistency: Option<ConsistencyLevels>,
}

impl EntityMetaBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            column_family_name: None,
            serial_version_uid: None,
            id_meta: None,
            property_metas: BTreeMap::new(),
            column_family_direct_mapping: false,
            counter_dao: None,
            consistency: None,
        }
    }

    pub fn column_family_name(mut self, name: impl Into<String>) -> Self {
        self.column_family_name = Some(name.into());
        self
    }

    pub fn serial_version_uid(mut self, uid: Option<i64>) -> Self {
        self.serial_version_uid = uid;
        self
    }

    pub fn id_meta(mut self, id_meta: Arc<PropertyMeta>) -> Self {
        self.id_meta = Some(id_meta);
        self
    }

    pub fn property_metas(mut self, metas: impl IntoIterator<Item = (String, Arc<PropertyMeta>)>) -> Self {
        self.property_metas.extend(metas);
        self
    }

    pub fn column_family_direct_mapping(mut self, direct: bool) -> Self {
        self.column_family_direct_mapping = direct;
        self
    }

    pub fn counter_dao(mut self, dao: Option<Arc<CounterDao>>) -> Self {
        self.counter_dao = dao;
        self
    }

    pub fn consistency(mut self, levels: ConsistencyLevels) -> Self {
        self.consistency = Some(levels);
        self
    }

    pub fn build(self, store: Arc<dyn StoreClient>, policy: Arc<ConsistencyPolicy>) -> CfmapResult<EntityMeta> {
        let class_name = self.class_name;
        let id_meta = self.id_meta.ok_or_else(|| {
            CfmapError::bean_mapping(format!(
                "The entity '{class_name}' should have at least one field with #[cfmap(id)] annotation"
            ))
        })?;
        let column_family_name = self.column_family_name.ok_or_else(|| {
            CfmapError::bean_mapping(format!(
                "The entity '{class_name}' should declare a column family name"
            ))
        })?;
        let consistency = self.consistency.unwrap_or_else(|| policy.defaults());

        let id_serializer = id_meta.value_serializer();
        let dao = if !self.column_family_direct_mapping {
            Some(EntityDao::DynamicComposite(Arc::new(GenericDynamicCompositeDao::new(
                store,
                policy,
                column_family_name.clone(),
                id_serializer,
                Serializer::Utf8,
            ))))
        } else {
            self.property_metas
                .values()
                .next()
                .filter(|p| !p.is_external())
                .map(|property| {
                    EntityDao::Composite(Arc::new(GenericCompositeDao::new(
                        store,
                        policy,
                        column_family_name.clone(),
                        id_serializer,
                        property.value_serializer(),
                    )))
                })
        };

        let meta = EntityMeta {
            class_name,
            column_family_name,
            serial_version_uid: self.serial_version_uid,
            id_meta,
            property_metas: self.property_metas,
            column_family_direct_mapping: self.column_family_direct_mapping,
            counter_dao: self.counter_dao,
            consistency,
            dao,
        };
        tracing::debug!(target: "metadata", entity = %meta.class_name, column_family = %meta.column_family_name, "entity meta built");
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyType;
    use crate::store::InMemoryStore;
    use crate::value::ValueKind;

    fn id() -> Arc<PropertyMeta> {
        Arc::new(
            PropertyMeta::builder("id")
                .value_kind(ValueKind::Long)
                .build(PropertyType::Simple)
                .unwrap(),
        )
    }

    fn property(name: &str, ty: PropertyType) -> (String, Arc<PropertyMeta>) {
        let mut builder = PropertyMeta::builder(name).value_kind(ValueKind::Text);
        if ty.is_wide_map() {
            builder = builder.key_kind(ValueKind::Int);
        }
        (name.to_string(), Arc::new(builder.build(ty).unwrap()))
    }

    #[test]
    fn test_regular_entity_uses_dynamic_composite_dao() {
        let meta = EntityMeta::builder("app::User")
            .column_family_name("User")
            .id_meta(id())
            .property_metas([property("name", PropertyType::Simple)])
            .build(Arc::new(InMemoryStore::new()), Arc::new(ConsistencyPolicy::default()))
            .unwrap();
        assert!(matches!(meta.dao(), Some(EntityDao::DynamicComposite(_))));
        assert_eq!(meta.id_serializer(), Serializer::Long);
        assert!(!meta.has_counter());
        assert!(meta.direct_mapping_property().is_none());
    }

    #[test]
    fn test_direct_mapping_uses_composite_dao() {
        let meta = EntityMeta::builder("app::Events")
            .column_family_name("events")
            .id_meta(id())
            .property_metas([property("events", PropertyType::WideMap)])
            .column_family_direct_mapping(true)
            .build(Arc::new(InMemoryStore::new()), Arc::new(ConsistencyPolicy::default()))
            .unwrap();
        let Some(EntityDao::Composite(dao)) = meta.dao() else {
            panic!("expected a composite DAO");
        };
        assert_eq!(dao.column_family(), "events");
        assert_eq!(dao.value_serializer(), Serializer::Utf8);
    }

    #[test]
    fn test_missing_id_message() {
        let err = EntityMeta::builder("app::NoId")
            .column_family_name("NoId")
            .build(Arc::new(InMemoryStore::new()), Arc::new(ConsistencyPolicy::default()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The entity 'app::NoId' should have at least one field with #[cfmap(id)] annotation"
        );
    }
}
