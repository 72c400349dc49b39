//! Join entity loading and proxying
//!
//! Join columns only store target ids. Turning them into entities is left to
//! an [`EntityLoader`] supplied by the caller; the mapping layer batches the
//! ids and hands every loaded entity to an [`EntityProxifier`].

use crate::error::{CfmapError, CfmapResult};
use crate::metadata::EntityMeta;
use crate::value::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Shared handle on a loaded entity instance.
pub type EntityRef = Arc<dyn Any + Send + Sync>;

/// Loads join targets by id.
pub trait EntityLoader: Send + Sync {
    /// Ids without a stored entity are left out of the result.
    fn load_join_entities(&self, meta: &EntityMeta, ids: &[Value]) -> CfmapResult<Vec<EntityRef>>;
}

/// Wraps loaded join entities, typically for lazy loading.
pub trait EntityProxifier: Send + Sync {
    fn build_proxy(&self, entity: EntityRef, meta: &EntityMeta) -> CfmapResult<EntityRef>;
}

/// Returns entities unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughProxifier;

impl EntityProxifier for PassThroughProxifier {
    fn build_proxy(&self, entity: EntityRef, _meta: &EntityMeta) -> CfmapResult<EntityRef> {
        Ok(entity)
    }
}

/// Batch loading of join entities keyed by their id.
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinEntityHelper;

impl JoinEntityHelper {
    /// Loads each distinct id once, in a single loader call.
    pub fn load_join_entities(
        &self,
        loader: &dyn EntityLoader,
        meta: &EntityMeta,
        ids: &[Value],
    ) -> CfmapResult<HashMap<Value, EntityRef>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let distinct: Vec<Value> = ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();
        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        tracing::debug!(target: "join", entity = meta.class_name(), ids = distinct.len(), "loading join entities");
        let loaded = loader.load_join_entities(meta, &distinct)?;
        let mut by_id = HashMap::with_capacity(loaded.len());
        for entity in loaded {
            let id = meta.id_meta().get_value(entity.as_ref())?.ok_or_else(|| {
                CfmapError::Validation(format!(
                    "Loaded join entity '{}' has no id",
                    meta.class_name()
                ))
            })?;
            by_id.insert(id, entity);
        }
        Ok(by_id)
    }

    /// Entity of `id` from a loaded batch, `None` when the target row is gone.
    pub fn resolve(
        &self,
        entities: &HashMap<Value, EntityRef>,
        meta: &EntityMeta,
        id: &Value,
    ) -> Option<EntityRef> {
        let entity = entities.get(id).cloned();
        if entity.is_none() {
            tracing::debug!(target: "join", entity = meta.class_name(), %id, "join entity not found, skipped");
        }
        entity
    }
}
