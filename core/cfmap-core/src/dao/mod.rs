//! Data access objects over one column family
//!
//! A DAO encodes row keys and values with fixed serializers and installs the
//! configured consistency level around every store call.

mod counter;

pub use counter::CounterDao;

use crate::composite::{Composite, DynamicComposite};
use crate::consistency::{ConsistencyGuard, ConsistencyLevels, ConsistencyPolicy};
use crate::error::CfmapResult;
use crate::iterator::SliceIterator;
use crate::serializer::Serializer;
use crate::store::{Column, ColumnName, CounterColumn, Mutator, SliceRange, StoreClient};
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Page size of slice iterators and counter row scans.
pub const DEFAULT_LENGTH: usize = 50;

/// DAO of entity rows, named by dynamic composites.
pub type GenericDynamicCompositeDao = AbstractDao<DynamicComposite>;

/// DAO of wide-map column families, named by ordered composites.
pub type GenericCompositeDao = AbstractDao<Composite>;

/// Column-family DAO, generic over the column name encoding.
pub struct AbstractDao<N> {
    store: Arc<dyn StoreClient>,
    policy: Arc<ConsistencyPolicy>,
    column_family: String,
    key_serializer: Serializer,
    value_serializer: Serializer,
    levels: Option<ConsistencyLevels>,
    /// Page size of whole-row scans
    page_size: usize,
    _name: PhantomData<fn() -> N>,
}

impl<N> Clone for AbstractDao<N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: Arc::clone(&self.policy),
            column_family: self.column_family.clone(),
            key_serializer: self.key_serializer,
            value_serializer: self.value_serializer,
            levels: self.levels,
            page_size: self.page_size,
            _name: PhantomData,
        }
    }
}

impl<N> fmt::Debug for AbstractDao<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractDao")
            .field("column_family", &self.column_family)
            .field("key_serializer", &self.key_serializer)
            .field("value_serializer", &self.value_serializer)
            .field("levels", &self.levels)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<N: Into<ColumnName>> AbstractDao<N> {
    pub fn new(
        store: Arc<dyn StoreClient>,
        policy: Arc<ConsistencyPolicy>,
        column_family: impl Into<String>,
        key_serializer: Serializer,
        value_serializer: Serializer,
    ) -> Self {
        Self {
            store,
            policy,
            column_family: column_family.into(),
            key_serializer,
            value_serializer,
            levels: None,
            page_size: DEFAULT_LENGTH,
            _name: PhantomData,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Same DAO with an explicit consistency pair that takes precedence
    /// over the column-family levels of the policy.
    pub fn with_levels(mut self, levels: ConsistencyLevels) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    pub fn key_serializer(&self) -> Serializer {
        self.key_serializer
    }

    pub fn value_serializer(&self) -> Serializer {
        self.value_serializer
    }

    pub fn levels(&self) -> Option<ConsistencyLevels> {
        self.levels
    }

    fn read_guard(&self) -> ConsistencyGuard {
        read_guard(&self.policy, &self.column_family, self.levels)
    }

    fn write_guard(&self) -> ConsistencyGuard {
        match self.levels {
            Some(levels) => self.policy.scoped_write_level(levels.write),
            None => self.policy.scoped_write(&self.column_family),
        }
    }

    fn row_key(&self, key: &Value) -> CfmapResult<Vec<u8>> {
        self.key_serializer.encode(key)
    }

    fn range(start: Option<N>, end: Option<N>, reversed: bool, count: usize) -> SliceRange {
        SliceRange::new(start.map(Into::into), end.map(Into::into), reversed, count)
    }

    pub fn build_mutator(&self) -> Mutator {
        Mutator::new()
    }

    /// Executes the accumulated mutations under the write level.
    pub fn execute_mutator(&self, mutator: Mutator) -> CfmapResult<()> {
        if mutator.is_empty() {
            return Ok(());
        }
        let guard = self.write_guard();
        tracing::trace!(target: "dao", column_family = %self.column_family, mutations = mutator.len(), level = %guard.level(), "execute mutator");
        self.store.execute(mutator.into_mutations(), guard.level())
    }

    pub fn get_value(&self, key: &Value, name: N) -> CfmapResult<Option<Value>> {
        let row_key = self.row_key(key)?;
        let guard = self.read_guard();
        tracing::trace!(target: "dao", column_family = %self.column_family, level = %guard.level(), "get value");
        let column = self
            .store
            .get_column(&self.column_family, &row_key, &name.into(), guard.level())?;
        column
            .map(|c| self.value_serializer.decode(&c.value))
            .transpose()
    }

    pub fn set_value(&self, key: &Value, name: N, value: &Value) -> CfmapResult<()> {
        self.set_value_with_ttl(key, name, value, 0)
    }

    pub fn set_value_with_ttl(&self, key: &Value, name: N, value: &Value, ttl: i32) -> CfmapResult<()> {
        let mut mutator = self.build_mutator();
        self.set_value_batch(key, name, value, ttl, &mut mutator)?;
        self.execute_mutator(mutator)
    }

    /// Queues an insertion. A `ttl` of 0 keeps the column forever.
    pub fn set_value_batch(
        &self,
        key: &Value,
        name: N,
        value: &Value,
        ttl: i32,
        mutator: &mut Mutator,
    ) -> CfmapResult<()> {
        let column = Column {
            name: name.into(),
            value: self.value_serializer.encode(value)?,
            ttl,
        };
        mutator.add_insertion(&self.column_family, self.row_key(key)?, column);
        Ok(())
    }

    pub fn remove_column(&self, key: &Value, name: N) -> CfmapResult<()> {
        let mut mutator = self.build_mutator();
        self.remove_column_batch(key, name, &mut mutator)?;
        self.execute_mutator(mutator)
    }

    pub fn remove_column_batch(&self, key: &Value, name: N, mutator: &mut Mutator) -> CfmapResult<()> {
        mutator.add_deletion(&self.column_family, self.row_key(key)?, Some(name.into()));
        Ok(())
    }

    /// Deletes every column of the range.
    pub fn remove_column_range(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<()> {
        let mut mutator = self.build_mutator();
        self.remove_column_range_batch(key, start, end, reversed, count, &mut mutator)?;
        self.execute_mutator(mutator)
    }

    pub fn remove_column_range_batch(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
        mutator: &mut Mutator,
    ) -> CfmapResult<()> {
        let row_key = self.row_key(key)?;
        for column in self.find_raw_columns_range(key, start, end, reversed, count)? {
            mutator.add_deletion(&self.column_family, row_key.clone(), Some(column.name));
        }
        Ok(())
    }

    pub fn find_raw_columns_range(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<Column>> {
        let row_key = self.row_key(key)?;
        let range = Self::range(start, end, reversed, count);
        let guard = self.read_guard();
        tracing::trace!(target: "dao", column_family = %self.column_family, count, reversed, level = %guard.level(), "find columns range");
        self.store
            .get_slice(&self.column_family, &row_key, &range, guard.level())
    }

    /// Column names and decoded values of the range.
    pub fn find_columns_range(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<(ColumnName, Value)>> {
        self.find_raw_columns_range(key, start, end, reversed, count)?
            .into_iter()
            .map(|c| Ok((c.name, self.value_serializer.decode(&c.value)?)))
            .collect()
    }

    pub fn find_values_range(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<Value>> {
        self.find_raw_columns_range(key, start, end, reversed, count)?
            .iter()
            .map(|c| self.value_serializer.decode(&c.value))
            .collect()
    }

    pub fn find_counter_columns_range(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<CounterColumn>> {
        let row_key = self.row_key(key)?;
        let range = Self::range(start, end, reversed, count);
        let guard = self.read_guard();
        tracing::trace!(target: "dao", column_family = %self.column_family, count, reversed, level = %guard.level(), "find counter columns range");
        self.store
            .get_counter_slice(&self.column_family, &row_key, &range, guard.level())
    }

    /// Lazy, paged iteration over a column range.
    pub fn get_column_slice_iterator(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        page_size: usize,
    ) -> CfmapResult<SliceIterator<Column>> {
        let row_key = self.row_key(key)?;
        let end = end.map(Into::into);
        let (store, policy) = (Arc::clone(&self.store), Arc::clone(&self.policy));
        let (column_family, levels) = (self.column_family.clone(), self.levels);
        Ok(SliceIterator::new(
            start.map(Into::into),
            page_size,
            move |start, count| {
                let range = SliceRange::new(start, end.clone(), reversed, count);
                let guard = read_guard(&policy, &column_family, levels);
                store.get_slice(&column_family, &row_key, &range, guard.level())
            },
        ))
    }

    /// Lazy, paged iteration over a counter range.
    pub fn get_counter_slice_iterator(
        &self,
        key: &Value,
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        page_size: usize,
    ) -> CfmapResult<SliceIterator<CounterColumn>> {
        let row_key = self.row_key(key)?;
        let end = end.map(Into::into);
        let (store, policy) = (Arc::clone(&self.store), Arc::clone(&self.policy));
        let (column_family, levels) = (self.column_family.clone(), self.levels);
        Ok(SliceIterator::new(
            start.map(Into::into),
            page_size,
            move |start, count| {
                let range = SliceRange::new(start, end.clone(), reversed, count);
                let guard = read_guard(&policy, &column_family, levels);
                store.get_counter_slice(&column_family, &row_key, &range, guard.level())
            },
        ))
    }

    /// Same range over several rows, in the order of `keys`.
    pub fn multi_get_slice_range(
        &self,
        keys: &[Value],
        start: Option<N>,
        end: Option<N>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<(Vec<u8>, Vec<Column>)>> {
        let row_keys = keys
            .iter()
            .map(|k| self.row_key(k))
            .collect::<CfmapResult<Vec<_>>>()?;
        let range = Self::range(start, end, reversed, count);
        let guard = self.read_guard();
        tracing::trace!(target: "dao", column_family = %self.column_family, rows = row_keys.len(), level = %guard.level(), "multiget slice");
        self.store
            .multiget_slice(&self.column_family, &row_keys, &range, guard.level())
    }

    pub fn remove_row(&self, key: &Value) -> CfmapResult<()> {
        let mut mutator = self.build_mutator();
        self.remove_row_batch(key, &mut mutator)?;
        self.execute_mutator(mutator)
    }

    pub fn remove_row_batch(&self, key: &Value, mutator: &mut Mutator) -> CfmapResult<()> {
        mutator.add_deletion(&self.column_family, self.row_key(key)?, None);
        Ok(())
    }

    /// Current counter value; 0 when the counter was never written.
    pub fn get_counter_value(&self, key: &Value, name: N) -> CfmapResult<i64> {
        self.counter_value_by_name(key, &name.into())
    }

    /// Sets a counter to `value` by adding the difference to its current value.
    pub fn insert_counter(&self, key: &Value, name: N, value: i64) -> CfmapResult<()> {
        let mut mutator = self.build_mutator();
        self.insert_counter_batch(key, name, value, &mut mutator)?;
        self.execute_mutator(mutator)
    }

    pub fn insert_counter_batch(
        &self,
        key: &Value,
        name: N,
        value: i64,
        mutator: &mut Mutator,
    ) -> CfmapResult<()> {
        let name = name.into();
        let current = self.counter_value_by_name(key, &name)?;
        mutator.add_counter(&self.column_family, self.row_key(key)?, name, value - current);
        Ok(())
    }

    /// Brings a counter back to 0 by decrementing its current value.
    pub fn remove_counter(&self, key: &Value, name: N) -> CfmapResult<()> {
        let name = name.into();
        let current = self.counter_value_by_name(key, &name)?;
        let mut mutator = self.build_mutator();
        mutator.add_counter(&self.column_family, self.row_key(key)?, name, -current);
        self.execute_mutator(mutator)
    }

    /// Zeroes every counter of the row.
    pub fn remove_counter_row(&self, key: &Value) -> CfmapResult<()> {
        let row_key = self.row_key(key)?;
        let mut mutator = self.build_mutator();
        for counter in self.get_counter_slice_iterator(key, None, None, false, self.page_size)? {
            let counter = counter?;
            mutator.add_counter(&self.column_family, row_key.clone(), counter.name, -counter.value);
        }
        self.execute_mutator(mutator)
    }

    pub fn truncate(&self) -> CfmapResult<()> {
        tracing::debug!(target: "dao", column_family = %self.column_family, "truncate");
        self.store.truncate(&self.column_family)
    }

    fn counter_value_by_name(&self, key: &Value, name: &ColumnName) -> CfmapResult<i64> {
        let row_key = self.row_key(key)?;
        let guard = self.read_guard();
        let counter = self
            .store
            .get_counter(&self.column_family, &row_key, name, guard.level())?;
        Ok(counter.map_or(0, |c| c.value))
    }
}

fn read_guard(
    policy: &ConsistencyPolicy,
    column_family: &str,
    levels: Option<ConsistencyLevels>,
) -> ConsistencyGuard {
    match levels {
        Some(levels) => policy.scoped_read_level(levels.read),
        None => policy.scoped_read(column_family),
    }
}
