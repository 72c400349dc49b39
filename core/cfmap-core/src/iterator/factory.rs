//! Key/value projections of fetched columns

use super::key_value::{CounterKeyValueIterator, JoinKeyValueIterator, KeyValue, KeyValueIterator};
use super::slice::SliceIterator;
use crate::composite::transformer;
use crate::error::CfmapResult;
use crate::join::{EntityLoader, EntityProxifier, EntityRef, JoinEntityHelper, PassThroughProxifier};
use crate::metadata::PropertyMeta;
use crate::store::{Column, CounterColumn};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Builds keys, values, ttls and cursors from raw columns.
///
/// Join projections load every distinct join id of a column list with a
/// single loader call.
#[derive(Clone)]
pub struct KeyValueFactory {
    loader: Arc<dyn EntityLoader>,
    proxifier: Arc<dyn EntityProxifier>,
    helper: JoinEntityHelper,
}

impl KeyValueFactory {
    pub fn new(loader: Arc<dyn EntityLoader>, proxifier: Arc<dyn EntityProxifier>) -> Self {
        Self {
            loader,
            proxifier,
            helper: JoinEntityHelper,
        }
    }

    /// Factory that hands loaded join entities back unwrapped.
    pub fn with_loader(loader: Arc<dyn EntityLoader>) -> Self {
        Self::new(loader, Arc::new(PassThroughProxifier))
    }

    // ── Plain columns ───────────────────────────

    pub fn create_key_value(&self, meta: &PropertyMeta, column: &Column) -> CfmapResult<KeyValue> {
        transformer::build_key_value(meta, column)
    }

    pub fn create_key(&self, meta: &PropertyMeta, column: &Column) -> CfmapResult<Value> {
        transformer::build_key(meta, &column.name)
    }

    pub fn create_value(&self, meta: &PropertyMeta, column: &Column) -> CfmapResult<Value> {
        transformer::build_value(meta, column)
    }

    pub fn create_ttl(&self, column: &Column) -> i32 {
        transformer::build_ttl(column)
    }

    pub fn create_key_value_list(&self, meta: &PropertyMeta, columns: &[Column]) -> CfmapResult<Vec<KeyValue>> {
        columns
            .iter()
            .map(|c| transformer::build_key_value(meta, c))
            .collect()
    }

    pub fn create_key_list(&self, meta: &PropertyMeta, columns: &[Column]) -> CfmapResult<Vec<Value>> {
        columns
            .iter()
            .map(|c| transformer::build_key(meta, &c.name))
            .collect()
    }

    pub fn create_value_list(&self, meta: &PropertyMeta, columns: &[Column]) -> CfmapResult<Vec<Value>> {
        columns
            .iter()
            .map(|c| transformer::build_value(meta, c))
            .collect()
    }

    pub fn create_ttl_list(&self, columns: &[Column]) -> Vec<i32> {
        columns.iter().map(transformer::build_ttl).collect()
    }

    // ── Join columns ────────────────────────────

    /// Entity referenced by one join column, `None` when it no longer exists.
    pub fn create_join_value(&self, meta: &PropertyMeta, column: &Column) -> CfmapResult<Option<EntityRef>> {
        Ok(self.create_join_value_list(meta, std::slice::from_ref(column))?.pop())
    }

    pub fn create_join_value_list(&self, meta: &PropertyMeta, columns: &[Column]) -> CfmapResult<Vec<EntityRef>> {
        Ok(self
            .create_join_key_value_list(meta, columns)?
            .into_iter()
            .map(|kv| kv.into_parts().1)
            .collect())
    }

    /// Columns whose join target is missing are left out.
    pub fn create_join_key_value_list(
        &self,
        meta: &PropertyMeta,
        columns: &[Column],
    ) -> CfmapResult<Vec<KeyValue<EntityRef>>> {
        let join_meta = meta.require_join_meta()?;
        let ids = columns
            .iter()
            .map(|c| transformer::build_raw_value(meta, c))
            .collect::<CfmapResult<Vec<_>>>()?;
        let entities = self
            .helper
            .load_join_entities(self.loader.as_ref(), &join_meta, &ids)?;

        columns
            .iter()
            .zip(&ids)
            .filter_map(|(column, id)| {
                let entity = self.helper.resolve(&entities, &join_meta, id)?;
                Some((column, entity))
            })
            .map(|(column, entity)| {
                Ok(KeyValue::new(
                    transformer::build_key(meta, &column.name)?,
                    self.proxifier.build_proxy(entity, &join_meta)?,
                    transformer::build_ttl(column),
                ))
            })
            .collect()
    }

    // ── Counter columns ─────────────────────────

    pub fn create_counter_key_value(&self, meta: &PropertyMeta, column: &CounterColumn) -> CfmapResult<KeyValue> {
        transformer::build_counter_key_value(meta, column)
    }

    pub fn create_counter_key(&self, meta: &PropertyMeta, column: &CounterColumn) -> CfmapResult<Value> {
        transformer::build_counter_key(meta, column)
    }

    pub fn create_counter_value(&self, column: &CounterColumn) -> Value {
        transformer::build_counter_value(column)
    }

    pub fn create_counter_key_value_list(
        &self,
        meta: &PropertyMeta,
        columns: &[CounterColumn],
    ) -> CfmapResult<Vec<KeyValue>> {
        columns
            .iter()
            .map(|c| transformer::build_counter_key_value(meta, c))
            .collect()
    }

    pub fn create_counter_key_list(&self, meta: &PropertyMeta, columns: &[CounterColumn]) -> CfmapResult<Vec<Value>> {
        columns
            .iter()
            .map(|c| transformer::build_counter_key(meta, c))
            .collect()
    }

    pub fn create_counter_value_list(&self, columns: &[CounterColumn]) -> Vec<Value> {
        columns.iter().map(transformer::build_counter_value).collect()
    }

    // ── Cursors ─────────────────────────────────

    pub fn create_iterator(&self, meta: Arc<PropertyMeta>, columns: SliceIterator<Column>) -> KeyValueIterator {
        KeyValueIterator::new(meta, columns)
    }

    /// Join cursor loading one batch of entities per fetched page.
    pub fn create_join_iterator(&self, meta: Arc<PropertyMeta>, columns: SliceIterator<Column>) -> JoinKeyValueIterator {
        let batch_size = columns.page_size();
        JoinKeyValueIterator::new(
            meta,
            columns,
            Arc::clone(&self.loader),
            Arc::clone(&self.proxifier),
            batch_size,
        )
    }

    pub fn create_counter_iterator(
        &self,
        meta: Arc<PropertyMeta>,
        columns: SliceIterator<CounterColumn>,
    ) -> CounterKeyValueIterator {
        CounterKeyValueIterator::new(meta, columns)
    }
}

impl fmt::Debug for KeyValueFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueFactory").finish_non_exhaustive()
    }
}
