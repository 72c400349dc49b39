//! Shared counter column family
//!
//! Every counter of every entity lives in one column family. A row holds the
//! counters of one entity instance and is keyed by the ordered composite
//! `(entity class, id as text)`. Columns are named like entity-row columns.

use super::AbstractDao;
use crate::composite::{Composite, DynamicComposite};
use crate::consistency::{ConsistencyLevels, ConsistencyPolicy};
use crate::error::CfmapResult;
use crate::iterator::SliceIterator;
use crate::metadata::PropertyMeta;
use crate::serializer::Serializer;
use crate::store::{CounterColumn, StoreClient};
use crate::value::Value;
use std::sync::Arc;

/// DAO of the shared counter column family.
#[derive(Debug, Clone)]
pub struct CounterDao {
    dao: AbstractDao<DynamicComposite>,
}

impl CounterDao {
    pub fn new(
        store: Arc<dyn StoreClient>,
        policy: Arc<ConsistencyPolicy>,
        column_family: impl Into<String>,
    ) -> Self {
        Self {
            dao: AbstractDao::new(store, policy, column_family, Serializer::Bytes, Serializer::Long),
        }
    }

    /// Page size of counter slice iterators.
    pub fn with_page_size(self, page_size: usize) -> Self {
        Self {
            dao: self.dao.with_page_size(page_size),
        }
    }

    /// Same DAO bound to a counter property's own consistency pair.
    pub fn with_levels(&self, levels: ConsistencyLevels) -> Self {
        Self {
            dao: self.dao.clone().with_levels(levels),
        }
    }

    pub fn column_family(&self) -> &str {
        self.dao.column_family()
    }

    pub fn levels(&self) -> Option<ConsistencyLevels> {
        self.dao.levels()
    }

    /// Row key of one entity instance.
    pub fn row_key(fqcn: &str, id_meta: &PropertyMeta, id: &Value) -> CfmapResult<Value> {
        let mut composite = Composite::new();
        composite
            .push(&Value::Text(fqcn.to_string()), Serializer::Utf8)?
            .push(&Value::Text(id_meta.write_value_to_string(id)), Serializer::Utf8)?;
        Ok(Value::Bytes(composite.to_bytes()?))
    }

    pub fn get_counter_value(&self, row_key: &Value, name: DynamicComposite) -> CfmapResult<i64> {
        self.dao.get_counter_value(row_key, name)
    }

    pub fn insert_counter(&self, row_key: &Value, name: DynamicComposite, value: i64) -> CfmapResult<()> {
        self.dao.insert_counter(row_key, name, value)
    }

    pub fn remove_counter(&self, row_key: &Value, name: DynamicComposite) -> CfmapResult<()> {
        self.dao.remove_counter(row_key, name)
    }

    pub fn remove_counter_row(&self, row_key: &Value) -> CfmapResult<()> {
        self.dao.remove_counter_row(row_key)
    }

    pub fn find_counter_columns_range(
        &self,
        row_key: &Value,
        start: Option<DynamicComposite>,
        end: Option<DynamicComposite>,
        reversed: bool,
        count: usize,
    ) -> CfmapResult<Vec<CounterColumn>> {
        self.dao
            .find_counter_columns_range(row_key, start, end, reversed, count)
    }

    pub fn get_counter_slice_iterator(
        &self,
        row_key: &Value,
        start: Option<DynamicComposite>,
        end: Option<DynamicComposite>,
        reversed: bool,
    ) -> CfmapResult<SliceIterator<CounterColumn>> {
        self.dao
            .get_counter_slice_iterator(row_key, start, end, reversed, self.dao.page_size())
    }

    pub fn truncate(&self) -> CfmapResult<()> {
        self.dao.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::DynamicCompositeKeyFactory;
    use crate::metadata::PropertyType;
    use crate::schema::ColumnFamilyHelper;
    use crate::store::InMemoryStore;
    use crate::value::ValueKind;

    fn id_meta() -> PropertyMeta {
        PropertyMeta::builder("id")
            .value_kind(ValueKind::Long)
            .build(PropertyType::Simple)
            .unwrap()
    }

    fn dao() -> CounterDao {
        let store = InMemoryStore::with_column_families([
            ColumnFamilyHelper::build_counter_cf("ks", "cfmap_counters"),
        ]);
        CounterDao::new(Arc::new(store), Arc::new(ConsistencyPolicy::default()), "cfmap_counters")
    }

    #[test]
    fn test_row_key_is_class_and_id_text() {
        let key = CounterDao::row_key("app::User", &id_meta(), &Value::Long(12)).unwrap();
        let Value::Bytes(bytes) = key else {
            panic!("row key should be raw bytes");
        };
        let composite = Composite::from_bytes(&bytes, &[Serializer::Utf8, Serializer::Utf8]).unwrap();
        assert_eq!(composite.get(0).unwrap().value().unwrap(), Value::from("app::User"));
        assert_eq!(composite.get(1).unwrap().value().unwrap(), Value::from("12"));
    }

    #[test]
    fn test_counters_of_two_entities_are_isolated() {
        let dao = dao();
        let meta = PropertyMeta::builder("visits")
            .value_kind(ValueKind::Long)
            .build(PropertyType::Simple)
            .unwrap();
        let name = || DynamicCompositeKeyFactory.create_for_property(&meta).unwrap();
        let user = CounterDao::row_key("app::User", &id_meta(), &Value::Long(1)).unwrap();
        let post = CounterDao::row_key("app::Post", &id_meta(), &Value::Long(1)).unwrap();

        dao.insert_counter(&user, name(), 10).unwrap();
        dao.insert_counter(&post, name(), 2).unwrap();
        assert_eq!(dao.get_counter_value(&user, name()).unwrap(), 10);
        assert_eq!(dao.get_counter_value(&post, name()).unwrap(), 2);

        dao.remove_counter_row(&user).unwrap();
        assert_eq!(dao.get_counter_value(&user, name()).unwrap(), 0);
        assert_eq!(dao.get_counter_value(&post, name()).unwrap(), 2);
    }
}
