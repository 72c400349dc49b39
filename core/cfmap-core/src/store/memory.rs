//! In-memory store backend using BTreeMap rows
//!
//! Used by tests and by applications that want the mapping layer without a
//! cluster. Consistency levels are accepted and ignored; TTLs are recorded
//! but never expire.

use super::{Column, ColumnName, CounterColumn, Mutation, MutationOp, SliceRange, StoreClient};
use crate::consistency::ConsistencyLevel;
use crate::error::{CfmapError, CfmapResult};
use crate::schema::ColumnFamilyDefinition;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

#[derive(Debug, Clone)]
enum Cell {
    Value { bytes: Vec<u8>, ttl: i32 },
    Counter(i64),
}

type Row = BTreeMap<ColumnName, Cell>;

#[derive(Debug)]
struct ColumnFamily {
    definition: ColumnFamilyDefinition,
    rows: HashMap<Vec<u8>, Row>,
}

/// In-memory store backend
#[derive(Debug, Default)]
pub struct InMemoryStore {
    column_families: RwLock<HashMap<String, ColumnFamily>>,
    add_cf_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-registers column families without counting them as creations.
    pub fn with_column_families(definitions: impl IntoIterator<Item = ColumnFamilyDefinition>) -> Self {
        let store = Self::new();
        {
            let mut cfs = store.column_families.write();
            for definition in definitions {
                cfs.insert(
                    definition.name.clone(),
                    ColumnFamily {
                        definition,
                        rows: HashMap::new(),
                    },
                );
            }
        }
        store
    }

    /// Number of `add_column_family` calls so far.
    pub fn add_column_family_calls(&self) -> usize {
        self.add_cf_calls.load(Ordering::SeqCst)
    }

    pub fn has_column_family(&self, name: &str) -> bool {
        self.column_families.read().contains_key(name)
    }

    /// Number of columns, counters included, in one row.
    pub fn row_len(&self, column_family: &str, row_key: &[u8]) -> usize {
        self.column_families
            .read()
            .get(column_family)
            .and_then(|cf| cf.rows.get(row_key))
            .map_or(0, BTreeMap::len)
    }

    fn unconfigured(name: &str) -> CfmapError {
        CfmapError::store(format!("unconfigured columnfamily {name}"))
    }

    fn with_row<T>(
        &self,
        column_family: &str,
        row_key: &[u8],
        f: impl FnOnce(Option<&Row>) -> T,
    ) -> CfmapResult<T> {
        let cfs = self.column_families.read();
        let cf = cfs.get(column_family).ok_or_else(|| Self::unconfigured(column_family))?;
        Ok(f(cf.rows.get(row_key)))
    }

    fn slice<'a>(row: &'a Row, range: &'a SliceRange) -> Box<dyn Iterator<Item = (&'a ColumnName, &'a Cell)> + 'a> {
        let (low, high) = if range.reversed {
            (range.end.as_ref(), range.start.as_ref())
        } else {
            (range.start.as_ref(), range.end.as_ref())
        };
        if let (Some(low), Some(high)) = (low, high)
            && low > high
        {
            return Box::new(std::iter::empty());
        }
        let bounds = (
            low.map_or(Bound::Unbounded, Bound::Included),
            high.map_or(Bound::Unbounded, Bound::Included),
        );
        let iter = row.range::<ColumnName, _>(bounds);
        if range.reversed {
            Box::new(iter.rev())
        } else {
            Box::new(iter)
        }
    }
}

impl StoreClient for InMemoryStore {
    fn describe_keyspace(&self, keyspace: &str) -> CfmapResult<Vec<ColumnFamilyDefinition>> {
        let cfs = self.column_families.read();
        let mut definitions: Vec<_> = cfs
            .values()
            .filter(|cf| cf.definition.keyspace == keyspace)
            .map(|cf| cf.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    fn add_column_family(&self, definition: &ColumnFamilyDefinition) -> CfmapResult<()> {
        self.add_cf_calls.fetch_add(1, Ordering::SeqCst);
        let mut cfs = self.column_families.write();
        if cfs.contains_key(&definition.name) {
            return Err(CfmapError::store(format!(
                "Cannot add already existing column family \"{}\" to keyspace \"{}\"",
                definition.name, definition.keyspace
            )));
        }
        trace!(column_family = %definition.name, "in-memory column family added");
        cfs.insert(
            definition.name.clone(),
            ColumnFamily {
                definition: definition.clone(),
                rows: HashMap::new(),
            },
        );
        Ok(())
    }

    fn get_column(
        &self,
        column_family: &str,
        row_key: &[u8],
        name: &ColumnName,
        _level: ConsistencyLevel,
    ) -> CfmapResult<Option<Column>> {
        self.with_row(column_family, row_key, |row| match row.and_then(|r| r.get(name)) {
            Some(Cell::Value { bytes, ttl }) => Some(Column {
                name: name.clone(),
                value: bytes.clone(),
                ttl: *ttl,
            }),
            _ => None,
        })
    }

    fn get_slice(
        &self,
        column_family: &str,
        row_key: &[u8],
        range: &SliceRange,
        _level: ConsistencyLevel,
    ) -> CfmapResult<Vec<Column>> {
        self.with_row(column_family, row_key, |row| {
            let Some(row) = row else {
                return Vec::new();
            };
            Self::slice(row, range)
                .filter_map(|(name, cell)| match cell {
                    Cell::Value { bytes, ttl } => Some(Column {
                        name: name.clone(),
                        value: bytes.clone(),
                        ttl: *ttl,
                    }),
                    Cell::Counter(_) => None,
                })
                .take(range.count)
                .collect()
        })
    }

    fn execute(&self, mutations: Vec<Mutation>, _level: ConsistencyLevel) -> CfmapResult<()> {
        let mut cfs = self.column_families.write();
        // Validate the whole batch before applying any of it.
        if let Some(unknown) = mutations.iter().find(|m| !cfs.contains_key(&m.column_family)) {
            return Err(Self::unconfigured(&unknown.column_family));
        }
        for Mutation {
            column_family,
            row_key,
            op,
        } in mutations
        {
            let Some(cf) = cfs.get_mut(&column_family) else {
                continue;
            };
            match op {
                MutationOp::Insert(column) => {
                    cf.rows.entry(row_key).or_default().insert(
                        column.name,
                        Cell::Value {
                            bytes: column.value,
                            ttl: column.ttl,
                        },
                    );
                }
                MutationOp::CounterAdd { name, delta } => {
                    let cell = cf
                        .rows
                        .entry(row_key)
                        .or_default()
                        .entry(name)
                        .or_insert(Cell::Counter(0));
                    if let Cell::Counter(current) = cell {
                        *current += delta;
                    } else {
                        *cell = Cell::Counter(delta);
                    }
                }
                MutationOp::Delete(Some(name)) | MutationOp::CounterDelete(Some(name)) => {
                    if let Some(row) = cf.rows.get_mut(&row_key) {
                        row.remove(&name);
                        if row.is_empty() {
                            cf.rows.remove(&row_key);
                        }
                    }
                }
                MutationOp::Delete(None) | MutationOp::CounterDelete(None) => {
                    cf.rows.remove(&row_key);
                }
            }
        }
        Ok(())
    }

    fn get_counter(
        &self,
        column_family: &str,
        row_key: &[u8],
        name: &ColumnName,
        _level: ConsistencyLevel,
    ) -> CfmapResult<Option<CounterColumn>> {
        self.with_row(column_family, row_key, |row| match row.and_then(|r| r.get(name)) {
            Some(Cell::Counter(value)) => Some(CounterColumn {
                name: name.clone(),
                value: *value,
            }),
            _ => None,
        })
    }

    fn get_counter_slice(
        &self,
        column_family: &str,
        row_key: &[u8],
        range: &SliceRange,
        _level: ConsistencyLevel,
    ) -> CfmapResult<Vec<CounterColumn>> {
        self.with_row(column_family, row_key, |row| {
            let Some(row) = row else {
                return Vec::new();
            };
            Self::slice(row, range)
                .filter_map(|(name, cell)| match cell {
                    Cell::Counter(value) => Some(CounterColumn {
                        name: name.clone(),
                        value: *value,
                    }),
                    Cell::Value { .. } => None,
                })
                .take(range.count)
                .collect()
        })
    }

    fn remove_row(
        &self,
        column_family: &str,
        row_key: &[u8],
        _level: ConsistencyLevel,
    ) -> CfmapResult<()> {
        let mut cfs = self.column_families.write();
        let cf = cfs.get_mut(column_family).ok_or_else(|| Self::unconfigured(column_family))?;
        cf.rows.remove(row_key);
        Ok(())
    }

    fn truncate(&self, column_family: &str) -> CfmapResult<()> {
        let mut cfs = self.column_families.write();
        let cf = cfs.get_mut(column_family).ok_or_else(|| Self::unconfigured(column_family))?;
        cf.rows.clear();
        Ok(())
    }
}
