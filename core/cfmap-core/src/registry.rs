//! Session bootstrap and entity metadata lookup

use crate::config::MappingConfig;
use crate::consistency::ConsistencyPolicy;
use crate::dao::CounterDao;
use crate::error::{CfmapError, CfmapResult};
use crate::iterator::KeyValueFactory;
use crate::join::EntityLoader;
use crate::metadata::EntityMeta;
use crate::parser::{Entity, EntityDescriptor, EntityParser};
use crate::schema::ColumnFamilyCreator;
use crate::store::StoreClient;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Parsed metadata of every entity of a session.
pub struct EntityRegistry {
    config: MappingConfig,
    store: Arc<dyn StoreClient>,
    policy: Arc<ConsistencyPolicy>,
    counter_dao: Arc<CounterDao>,
    entity_metas: HashMap<String, Arc<EntityMeta>>,
}

impl EntityRegistry {
    /// Parses every descriptor, resolves joins, then validates or creates
    /// the column families they need.
    pub fn bootstrap(
        config: MappingConfig,
        store: Arc<dyn StoreClient>,
        descriptors: impl IntoIterator<Item = EntityDescriptor>,
    ) -> CfmapResult<Self> {
        let config = config.validate()?;
        let policy = Arc::new(ConsistencyPolicy::new(config.default_consistency()));
        let counter_dao = Arc::new(
            CounterDao::new(
                Arc::clone(&store),
                Arc::clone(&policy),
                config.counter_column_family.clone(),
            )
            .with_page_size(config.slice_page_size),
        );
        let parser = EntityParser::new(Arc::clone(&store), Arc::clone(&policy), Arc::clone(&counter_dao));

        let mut entity_metas = HashMap::new();
        let mut pending_joins = Vec::new();
        for descriptor in descriptors {
            let meta = parser.parse_entity(&descriptor, &mut pending_joins)?;
            let class_name = meta.class_name().to_string();
            if entity_metas.insert(class_name.clone(), Arc::new(meta)).is_some() {
                return Err(CfmapError::bean_mapping(format!(
                    "The entity '{class_name}' is registered more than once"
                )));
            }
        }
        parser.fill_join_entity_meta(&pending_joins, &entity_metas)?;

        let has_counter = entity_metas.values().any(|m| m.has_counter());
        let mut creator = ColumnFamilyCreator::new(Arc::clone(&store), config.keyspace.clone())?
            .with_counter_column_family(config.counter_column_family.clone());
        creator.validate_or_create_column_families(
            entity_metas.values().map(Arc::as_ref),
            config.force_column_family_creation,
            has_counter,
        )?;

        info!(
            keyspace = %config.keyspace,
            entities = entity_metas.len(),
            created_column_families = creator.created_column_families().len(),
            "entity registry bootstrapped"
        );
        Ok(Self {
            config,
            store,
            policy,
            counter_dao,
            entity_metas,
        })
    }

    pub fn entity_meta(&self, class_name: &str) -> Option<&Arc<EntityMeta>> {
        self.entity_metas.get(class_name)
    }

    pub fn entity_meta_of<E: Entity>(&self) -> Option<&Arc<EntityMeta>> {
        self.entity_meta(E::CLASS_NAME)
    }

    pub fn entity_metas(&self) -> impl Iterator<Item = &Arc<EntityMeta>> {
        self.entity_metas.values()
    }

    pub fn len(&self) -> usize {
        self.entity_metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_metas.is_empty()
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    pub fn policy(&self) -> &Arc<ConsistencyPolicy> {
        &self.policy
    }

    pub fn counter_dao(&self) -> &Arc<CounterDao> {
        &self.counter_dao
    }

    /// Page size for slice iterators.
    pub fn slice_page_size(&self) -> usize {
        self.config.slice_page_size
    }

    pub fn key_value_factory(&self, loader: Arc<dyn EntityLoader>) -> KeyValueFactory {
        KeyValueFactory::with_loader(loader)
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("config", &self.config)
            .field("entities", &self.entity_metas.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
