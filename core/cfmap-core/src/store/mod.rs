//! Wide-column store abstraction
//!
//! Every row lives in a column family and is addressed by its encoded row
//! key. Columns inside a row are sorted by their composite name.

mod memory;
mod mutator;

pub use memory::InMemoryStore;
pub use mutator::Mutator;

use crate::composite::{Component, Composite, DynamicComposite};
use crate::consistency::ConsistencyLevel;
use crate::error::CfmapResult;
use crate::schema::ColumnFamilyDefinition;
use std::cmp::Ordering;

/// Composite name of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnName {
    /// Wide-map column families
    Composite(Composite),
    /// Entity rows
    Dynamic(DynamicComposite),
}

impl ColumnName {
    pub fn components(&self) -> &[Component] {
        match self {
            ColumnName::Composite(c) => c.components(),
            ColumnName::Dynamic(c) => c.components(),
        }
    }

    /// Index of the first key component. Dynamic names start with the
    /// property name.
    pub fn key_offset(&self) -> usize {
        match self {
            ColumnName::Composite(_) => 0,
            ColumnName::Dynamic(_) => 1,
        }
    }

    pub fn to_bytes(&self) -> CfmapResult<Vec<u8>> {
        match self {
            ColumnName::Composite(c) => c.to_bytes(),
            ColumnName::Dynamic(c) => c.to_bytes(),
        }
    }
}

impl Ord for ColumnName {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ColumnName::Composite(a), ColumnName::Composite(b)) => a.cmp(b),
            (ColumnName::Dynamic(a), ColumnName::Dynamic(b)) => a.cmp(b),
            (ColumnName::Composite(_), ColumnName::Dynamic(_)) => Ordering::Less,
            (ColumnName::Dynamic(_), ColumnName::Composite(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ColumnName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Composite> for ColumnName {
    fn from(c: Composite) -> Self {
        ColumnName::Composite(c)
    }
}

impl From<DynamicComposite> for ColumnName {
    fn from(c: DynamicComposite) -> Self {
        ColumnName::Dynamic(c)
    }
}

/// Regular column. A `ttl` of 0 means the column never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: ColumnName,
    pub value: Vec<u8>,
    pub ttl: i32,
}

/// Counter column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterColumn {
    pub name: ColumnName,
    pub value: i64,
}

/// Columns that can be paged by name.
pub trait NamedColumn: Clone {
    fn name(&self) -> &ColumnName;
}

impl NamedColumn for Column {
    fn name(&self) -> &ColumnName {
        &self.name
    }
}

impl NamedColumn for CounterColumn {
    fn name(&self) -> &ColumnName {
        &self.name
    }
}

/// Column range within one row.
///
/// When `reversed`, columns come from `start` downwards to `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRange {
    pub start: Option<ColumnName>,
    pub end: Option<ColumnName>,
    pub reversed: bool,
    pub count: usize,
}

impl SliceRange {
    pub fn new(
        start: Option<ColumnName>,
        end: Option<ColumnName>,
        reversed: bool,
        count: usize,
    ) -> Self {
        Self {
            start,
            end,
            reversed,
            count,
        }
    }
}

/// Write operation on one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    Insert(Column),
    /// Deletes one column, or the whole row when `None`.
    Delete(Option<ColumnName>),
    CounterAdd { name: ColumnName, delta: i64 },
    /// Deletes one counter column, or the whole counter row when `None`.
    CounterDelete(Option<ColumnName>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub column_family: String,
    pub row_key: Vec<u8>,
    pub op: MutationOp,
}

/// Client of the wide-column store.
///
/// Implementations wrap their own failures into `CfmapError::Store`.
pub trait StoreClient: Send + Sync {
    /// Column families currently defined in `keyspace`.
    fn describe_keyspace(&self, keyspace: &str) -> CfmapResult<Vec<ColumnFamilyDefinition>>;

    fn add_column_family(&self, definition: &ColumnFamilyDefinition) -> CfmapResult<()>;

    fn get_column(
        &self,
        column_family: &str,
        row_key: &[u8],
        name: &ColumnName,
        level: ConsistencyLevel,
    ) -> CfmapResult<Option<Column>>;

    fn get_slice(
        &self,
        column_family: &str,
        row_key: &[u8],
        range: &SliceRange,
        level: ConsistencyLevel,
    ) -> CfmapResult<Vec<Column>>;

    /// Same slice over several rows. Rows without columns are included
    /// with an empty list.
    fn multiget_slice(
        &self,
        column_family: &str,
        row_keys: &[Vec<u8>],
        range: &SliceRange,
        level: ConsistencyLevel,
    ) -> CfmapResult<Vec<(Vec<u8>, Vec<Column>)>> {
        row_keys
            .iter()
            .map(|key| Ok((key.clone(), self.get_slice(column_family, key, range, level)?)))
            .collect()
    }

    /// Applies a batch of mutations.
    fn execute(&self, mutations: Vec<Mutation>, level: ConsistencyLevel) -> CfmapResult<()>;

    fn get_counter(
        &self,
        column_family: &str,
        row_key: &[u8],
        name: &ColumnName,
        level: ConsistencyLevel,
    ) -> CfmapResult<Option<CounterColumn>>;

    fn get_counter_slice(
        &self,
        column_family: &str,
        row_key: &[u8],
        range: &SliceRange,
        level: ConsistencyLevel,
    ) -> CfmapResult<Vec<CounterColumn>>;

    fn remove_row(
        &self,
        column_family: &str,
        row_key: &[u8],
        level: ConsistencyLevel,
    ) -> CfmapResult<()>;

    fn truncate(&self, column_family: &str) -> CfmapResult<()>;
}
