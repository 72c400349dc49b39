//! Key/value projections and cursors over wide-map columns

use super::slice::SliceIterator;
use crate::composite::transformer;
use crate::error::{CfmapError, CfmapResult};
use crate::join::{EntityLoader, EntityProxifier, EntityRef, JoinEntityHelper};
use crate::metadata::PropertyMeta;
use crate::store::{Column, ColumnName, CounterColumn};
use crate::value::Value;
use std::collections::VecDeque;
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;

/// One wide-map entry. A `ttl` of 0 means the entry never expires.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue<V = Value> {
    key: Value,
    value: V,
    ttl: i32,
}

impl<V> KeyValue<V> {
    pub fn new(key: Value, value: V, ttl: i32) -> Self {
        Self { key, value, ttl }
    }

    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn ttl(&self) -> i32 {
        self.ttl
    }

    pub fn into_parts(self) -> (Value, V, i32) {
        (self.key, self.value, self.ttl)
    }
}

/// Single-pass cursor over wide-map entries.
pub trait KeyValueCursor {
    type Value;

    fn has_next(&mut self) -> CfmapResult<bool>;

    /// Next entry; `NoSuchElement` once exhausted.
    fn next_key_value(&mut self) -> CfmapResult<KeyValue<Self::Value>>;

    fn next_key(&mut self) -> CfmapResult<Value> {
        Ok(self.next_key_value()?.key)
    }

    fn next_value(&mut self) -> CfmapResult<Self::Value> {
        Ok(self.next_key_value()?.value)
    }

    fn next_ttl(&mut self) -> CfmapResult<i32> {
        Ok(self.next_key_value()?.ttl)
    }

    /// Removes the entry returned last.
    fn remove(&mut self) -> CfmapResult<()>;
}

/// Deletes one column by name.
pub type Remover = Box<dyn FnMut(&ColumnName) -> CfmapResult<()> + Send>;

fn remove_last(remover: &mut Option<Remover>, last: &mut Option<ColumnName>) -> CfmapResult<()> {
    let remover = remover
        .as_mut()
        .ok_or_else(|| CfmapError::Unsupported("Cannot remove key value pair".to_string()))?;
    let name = last.take().ok_or_else(|| {
        CfmapError::Validation("There is no key value pair to remove".to_string())
    })?;
    remover(&name)
}

// ════════════════════════════════════════════
// KeyValueIterator
// ════════════════════════════════════════════

/// Cursor decoding plain wide-map columns.
pub struct KeyValueIterator<I: Iterator<Item = CfmapResult<Column>> = SliceIterator<Column>> {
    meta: Arc<PropertyMeta>,
    columns: Peekable<I>,
    remover: Option<Remover>,
    last: Option<ColumnName>,
}

impl<I: Iterator<Item = CfmapResult<Column>>> KeyValueIterator<I> {
    pub fn new(meta: Arc<PropertyMeta>, columns: I) -> Self {
        Self {
            meta,
            columns: columns.peekable(),
            remover: None,
            last: None,
        }
    }

    pub fn with_remover(mut self, remover: Remover) -> Self {
        self.remover = Some(remover);
        self
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> KeyValueCursor for KeyValueIterator<I> {
    type Value = Value;

    fn has_next(&mut self) -> CfmapResult<bool> {
        Ok(self.columns.peek().is_some())
    }

    fn next_key_value(&mut self) -> CfmapResult<KeyValue> {
        let column = self.columns.next().ok_or(CfmapError::NoSuchElement)??;
        let kv = transformer::build_key_value(&self.meta, &column)?;
        self.last = Some(column.name);
        Ok(kv)
    }

    fn remove(&mut self) -> CfmapResult<()> {
        remove_last(&mut self.remover, &mut self.last)
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> Iterator for KeyValueIterator<I> {
    type Item = CfmapResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.columns.peek()?;
        Some(self.next_key_value())
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> fmt::Debug for KeyValueIterator<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueIterator")
            .field("property", &self.meta.name())
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════
// JoinKeyValueIterator
// ════════════════════════════════════════════

/// Cursor resolving join ids into entities, one loader call per batch.
pub struct JoinKeyValueIterator<I: Iterator<Item = CfmapResult<Column>> = SliceIterator<Column>> {
    meta: Arc<PropertyMeta>,
    columns: I,
    loader: Arc<dyn EntityLoader>,
    proxifier: Arc<dyn EntityProxifier>,
    batch_size: usize,
    buffer: VecDeque<(ColumnName, KeyValue<EntityRef>)>,
    remover: Option<Remover>,
    last: Option<ColumnName>,
    done: bool,
}

impl<I: Iterator<Item = CfmapResult<Column>>> JoinKeyValueIterator<I> {
    pub fn new(
        meta: Arc<PropertyMeta>,
        columns: I,
        loader: Arc<dyn EntityLoader>,
        proxifier: Arc<dyn EntityProxifier>,
        batch_size: usize,
    ) -> Self {
        Self {
            meta,
            columns,
            loader,
            proxifier,
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            remover: None,
            last: None,
            done: false,
        }
    }

    pub fn with_remover(mut self, remover: Remover) -> Self {
        self.remover = Some(remover);
        self
    }

    /// Loads pages until one yields an entry or the columns run out.
    fn fill(&mut self) -> CfmapResult<()> {
        while self.buffer.is_empty() && !self.done {
            let entries = self.load_batch()?;
            self.buffer.extend(entries);
        }
        Ok(())
    }

    /// One page of resolved entries. Columns whose target is gone are skipped.
    fn load_batch(&mut self) -> CfmapResult<Vec<(ColumnName, KeyValue<EntityRef>)>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        for column in self.columns.by_ref() {
            batch.push(column?);
            if batch.len() == self.batch_size {
                break;
            }
        }
        if batch.len() < self.batch_size {
            self.done = true;
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let join_meta = self.meta.require_join_meta()?;
        let ids = batch
            .iter()
            .map(|c| transformer::build_raw_value(&self.meta, c))
            .collect::<CfmapResult<Vec<_>>>()?;
        let helper = JoinEntityHelper;
        let entities = helper.load_join_entities(self.loader.as_ref(), &join_meta, &ids)?;
        let mut entries = Vec::with_capacity(batch.len());
        for (column, id) in batch.into_iter().zip(ids) {
            let Some(entity) = helper.resolve(&entities, &join_meta, &id) else {
                continue;
            };
            let key = transformer::build_key(&self.meta, &column.name)?;
            let proxy = self.proxifier.build_proxy(entity, &join_meta)?;
            entries.push((column.name, KeyValue::new(key, proxy, column.ttl)));
        }
        Ok(entries)
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> KeyValueCursor for JoinKeyValueIterator<I> {
    type Value = EntityRef;

    fn has_next(&mut self) -> CfmapResult<bool> {
        self.fill()?;
        Ok(!self.buffer.is_empty())
    }

    fn next_key_value(&mut self) -> CfmapResult<KeyValue<EntityRef>> {
        self.fill()?;
        let (name, kv) = self.buffer.pop_front().ok_or(CfmapError::NoSuchElement)?;
        self.last = Some(name);
        Ok(kv)
    }

    fn remove(&mut self) -> CfmapResult<()> {
        remove_last(&mut self.remover, &mut self.last)
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> Iterator for JoinKeyValueIterator<I> {
    type Item = CfmapResult<KeyValue<EntityRef>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_key_value()),
            Ok(false) => None,
            Err(e) => {
                self.done = true;
                self.buffer.clear();
                Some(Err(e))
            }
        }
    }
}

impl<I: Iterator<Item = CfmapResult<Column>>> fmt::Debug for JoinKeyValueIterator<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinKeyValueIterator")
            .field("property", &self.meta.name())
            .field("batch_size", &self.batch_size)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════
// CounterKeyValueIterator
// ════════════════════════════════════════════

/// Cursor over counter columns. Counters carry no ttl and are never removed.
pub struct CounterKeyValueIterator<I: Iterator<Item = CfmapResult<CounterColumn>> = SliceIterator<CounterColumn>> {
    meta: Arc<PropertyMeta>,
    columns: Peekable<I>,
}

impl<I: Iterator<Item = CfmapResult<CounterColumn>>> CounterKeyValueIterator<I> {
    pub fn new(meta: Arc<PropertyMeta>, columns: I) -> Self {
        Self {
            meta,
            columns: columns.peekable(),
        }
    }
}

impl<I: Iterator<Item = CfmapResult<CounterColumn>>> KeyValueCursor for CounterKeyValueIterator<I> {
    type Value = Value;

    fn has_next(&mut self) -> CfmapResult<bool> {
        Ok(self.columns.peek().is_some())
    }

    fn next_key_value(&mut self) -> CfmapResult<KeyValue> {
        let column = self.columns.next().ok_or(CfmapError::NoSuchElement)??;
        transformer::build_counter_key_value(&self.meta, &column)
    }

    fn next_ttl(&mut self) -> CfmapResult<i32> {
        Err(CfmapError::Unsupported(
            "Ttl does not exist for counter type".to_string(),
        ))
    }

    fn remove(&mut self) -> CfmapResult<()> {
        Err(CfmapError::Unsupported(
            "Cannot remove counter value. Please set its value to 0 instead of removing it"
                .to_string(),
        ))
    }
}

impl<I: Iterator<Item = CfmapResult<CounterColumn>>> Iterator for CounterKeyValueIterator<I> {
    type Item = CfmapResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.columns.peek()?;
        Some(self.next_key_value())
    }
}

impl<I: Iterator<Item = CfmapResult<CounterColumn>>> fmt::Debug for CounterKeyValueIterator<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterKeyValueIterator")
            .field("property", &self.meta.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{CompositeKeyFactory, transformer::encode_value};
    use crate::metadata::PropertyType;
    use crate::value::ValueKind;
    use std::sync::Mutex;

    fn meta() -> Arc<PropertyMeta> {
        Arc::new(
            PropertyMeta::builder("scores")
                .key_kind(ValueKind::Int)
                .value_kind(ValueKind::Long)
                .build(PropertyType::WideMap)
                .unwrap(),
        )
    }

    fn column(meta: &PropertyMeta, key: i32, value: i64) -> Column {
        Column {
            name: CompositeKeyFactory
                .create_for_insert(meta, &Value::Int(key))
                .unwrap()
                .into(),
            value: encode_value(meta, &Value::Long(value)).unwrap(),
            ttl: 0,
        }
    }

    fn counter(meta: &PropertyMeta, key: i32, value: i64) -> CounterColumn {
        CounterColumn {
            name: CompositeKeyFactory
                .create_for_insert(meta, &Value::Int(key))
                .unwrap()
                .into(),
            value,
        }
    }

    #[test]
    fn test_key_value_cursor_exhaustion() {
        let meta = meta();
        let columns = vec![Ok(column(&meta, 1, 10)), Ok(column(&meta, 2, 20))];
        let mut cursor = KeyValueIterator::new(meta.clone(), columns.into_iter());
        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.next_key().unwrap(), Value::Int(1));
        assert_eq!(cursor.next_value().unwrap(), Value::Long(20));
        assert!(!cursor.has_next().unwrap());
        assert!(matches!(
            cursor.next_key_value(),
            Err(CfmapError::NoSuchElement)
        ));
    }

    #[test]
    fn test_remove_without_remover_is_unsupported() {
        let meta = meta();
        let mut cursor = KeyValueIterator::new(meta.clone(), vec![Ok(column(&meta, 1, 1))].into_iter());
        cursor.next_key_value().unwrap();
        assert!(matches!(cursor.remove(), Err(CfmapError::Unsupported(_))));
    }

    #[test]
    fn test_remove_calls_remover_with_last_name() {
        let meta = meta();
        let removed = Arc::new(Mutex::new(Vec::new()));
        let sink = removed.clone();
        let mut cursor = KeyValueIterator::new(meta.clone(), vec![Ok(column(&meta, 7, 1))].into_iter())
            .with_remover(Box::new(move |name: &ColumnName| {
                sink.lock().unwrap().push(name.clone());
                Ok(())
            }));
        cursor.next_key_value().unwrap();
        cursor.remove().unwrap();
        assert_eq!(removed.lock().unwrap().len(), 1);
        // Nothing left to remove until the next entry is read.
        assert!(cursor.remove().is_err());
    }

    #[test]
    fn test_counter_cursor_rejects_ttl_and_remove() {
        let meta = meta();
        let mut cursor = CounterKeyValueIterator::new(
            meta.clone(),
            vec![Ok(counter(&meta, 1, 5))].into_iter(),
        );
        assert_eq!(
            cursor.next_ttl().unwrap_err().to_string(),
            "Ttl does not exist for counter type"
        );
        assert_eq!(
            cursor.remove().unwrap_err().to_string(),
            "Cannot remove counter value. Please set its value to 0 instead of removing it"
        );
        let kv = cursor.next_key_value().unwrap();
        assert_eq!(kv.value(), &Value::Long(5));
        assert!(matches!(cursor.next_key_value(), Err(CfmapError::NoSuchElement)));
    }

    #[test]
    fn test_iterator_adapter_stops_at_end() {
        let meta = meta();
        let columns = (1..=3).map(|i| Ok(column(&meta, i, i64::from(i))));
        let values: Vec<_> = KeyValueIterator::new(meta.clone(), columns.collect::<Vec<_>>().into_iter())
            .map(|kv| kv.unwrap().into_parts().1)
            .collect();
        assert_eq!(values, vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
    }
}
