//! Composite names for inserts and range queries
//!
//! Ordered composites name wide-map columns: the key components in order.
//! Dynamic composites name entity-row columns: the property name followed by
//! the key components, if any.

use super::component::{ComponentEquality, Composite, DynamicComposite};
use crate::error::{CfmapError, CfmapResult};
use crate::metadata::PropertyMeta;
use crate::serializer::Serializer;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Cow;

/// Inclusiveness of a range query's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundingMode {
    #[default]
    InclusiveBounds,
    ExclusiveBounds,
    InclusiveStartBoundOnly,
    InclusiveEndBoundOnly,
}

/// Scan direction of a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WideMapOrdering {
    #[default]
    Ascending,
    Descending,
}

impl WideMapOrdering {
    pub fn is_reversed(self) -> bool {
        self == WideMapOrdering::Descending
    }
}

impl BoundingMode {
    /// End-of-component markers of the last start and end components.
    ///
    /// In descending order the start bound is the high end of the range.
    pub fn equalities(self, ordering: WideMapOrdering) -> (ComponentEquality, ComponentEquality) {
        use ComponentEquality::{Equal as EQ, GreaterThanEqual as GTE, LessThanEqual as LTE};
        match (ordering, self) {
            (WideMapOrdering::Ascending, BoundingMode::InclusiveBounds) => (EQ, GTE),
            (WideMapOrdering::Ascending, BoundingMode::ExclusiveBounds) => (GTE, LTE),
            (WideMapOrdering::Ascending, BoundingMode::InclusiveStartBoundOnly) => (EQ, LTE),
            (WideMapOrdering::Ascending, BoundingMode::InclusiveEndBoundOnly) => (GTE, GTE),
            (WideMapOrdering::Descending, BoundingMode::InclusiveBounds) => (GTE, EQ),
            (WideMapOrdering::Descending, BoundingMode::ExclusiveBounds) => (LTE, GTE),
            (WideMapOrdering::Descending, BoundingMode::InclusiveStartBoundOnly) => (GTE, GTE),
            (WideMapOrdering::Descending, BoundingMode::InclusiveEndBoundOnly) => (LTE, EQ),
        }
    }
}

type KeyParts<'a> = SmallVec<[(Cow<'a, Value>, Serializer); 4]>;

fn key_serializers(meta: &PropertyMeta) -> CfmapResult<SmallVec<[Serializer; 4]>> {
    if let Some(multi) = meta.multi_key_properties() {
        return Ok(multi.component_serializers().iter().copied().collect());
    }
    let serializer = meta.key_serializer().ok_or_else(|| {
        CfmapError::Unsupported(format!("The property '{}' has no key", meta.name()))
    })?;
    Ok(SmallVec::from_slice(&[serializer]))
}

/// Splits a key into (value, serializer) parts. Null parts are kept.
fn key_parts<'a>(meta: &PropertyMeta, key: &'a Value) -> CfmapResult<KeyParts<'a>> {
    let serializers = key_serializers(meta)?;
    if meta.multi_key_properties().is_none() {
        return Ok(SmallVec::from_iter([(
            meta.write_value_as_supported_type_or_string(key),
            serializers[0],
        )]));
    }
    let Value::Components(values) = key else {
        return Err(CfmapError::type_mismatch(
            format!("multi-key components for property '{}'", meta.name()),
            key.kind_name(),
        ));
    };
    if values.len() > serializers.len() {
        return Err(CfmapError::Validation(format!(
            "There should be at most {} values for the multi-key of property '{}'",
            serializers.len(),
            meta.name()
        )));
    }
    Ok(values
        .iter()
        .zip(serializers)
        .map(|(v, s)| (meta.write_value_as_supported_type_or_string(v), s))
        .collect())
}

/// Parts of a full key, as written on insert.
fn insert_parts<'a>(meta: &PropertyMeta, key: &'a Value) -> CfmapResult<KeyParts<'a>> {
    let expected = key_serializers(meta)?.len();
    let parts = key_parts(meta, key)?;
    if parts.len() != expected {
        return Err(CfmapError::Validation(format!(
            "There should be {expected} values for the multi-key of property '{}'",
            meta.name()
        )));
    }
    if parts.iter().any(|(v, _)| v.is_null()) {
        return Err(CfmapError::Validation(format!(
            "The key of property '{}' should not contain null values",
            meta.name()
        )));
    }
    Ok(parts)
}

/// Non-null prefix of a query key; `None` when the key has no value at all.
fn prefix_parts<'a>(meta: &PropertyMeta, key: Option<&'a Value>) -> CfmapResult<Option<KeyParts<'a>>> {
    let Some(key) = key.filter(|k| !k.is_null()) else {
        return Ok(None);
    };
    let mut parts = key_parts(meta, key)?;
    let Some(last) = parts.iter().rposition(|(v, _)| !v.is_null()) else {
        return Ok(None);
    };
    if parts[..last].iter().any(|(v, _)| v.is_null()) {
        return Err(CfmapError::Validation(
            "There should not be any null value between two non-null keys".to_string(),
        ));
    }
    parts.truncate(last + 1);
    Ok(Some(parts))
}

fn equality_at(index: usize, len: usize, last: ComponentEquality) -> ComponentEquality {
    if index + 1 == len {
        last
    } else {
        ComponentEquality::Equal
    }
}

// ════════════════════════════════════════════
// CompositeKeyFactory
// ════════════════════════════════════════════

/// Builds ordered composites for wide-map column families.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeKeyFactory;

impl CompositeKeyFactory {
    /// Column name of a wide-map entry. Every component is required.
    pub fn create_for_insert(&self, meta: &PropertyMeta, key: &Value) -> CfmapResult<Composite> {
        let mut composite = Composite::new();
        for (value, serializer) in insert_parts(meta, key)? {
            composite.push(&value, serializer)?;
        }
        Ok(composite)
    }

    /// Single-component bound with an explicit marker.
    pub fn create_base_for_query(
        &self,
        meta: &PropertyMeta,
        key: &Value,
        equality: ComponentEquality,
    ) -> CfmapResult<Composite> {
        let serializer = key_serializers(meta)?[0];
        let value = meta.write_value_as_supported_type_or_string(key);
        let mut composite = Composite::new();
        composite.push_with_equality(&value, serializer, equality)?;
        Ok(composite)
    }

    /// Start and end bounds of a range. A missing or all-null key leaves
    /// that side open.
    pub fn create_for_query(
        &self,
        meta: &PropertyMeta,
        start: Option<&Value>,
        end: Option<&Value>,
        bounds: BoundingMode,
        ordering: WideMapOrdering,
    ) -> CfmapResult<(Option<Composite>, Option<Composite>)> {
        let (start_eq, end_eq) = bounds.equalities(ordering);
        let start = self.bound(meta, start, start_eq)?;
        let end = self.bound(meta, end, end_eq)?;
        Ok((start, end))
    }

    fn bound(
        &self,
        meta: &PropertyMeta,
        key: Option<&Value>,
        last: ComponentEquality,
    ) -> CfmapResult<Option<Composite>> {
        let Some(parts) = prefix_parts(meta, key)? else {
            return Ok(None);
        };
        let mut composite = Composite::new();
        let len = parts.len();
        for (i, (value, serializer)) in parts.into_iter().enumerate() {
            composite.push_with_equality(&value, serializer, equality_at(i, len, last))?;
        }
        Ok(Some(composite))
    }
}

// ════════════════════════════════════════════
// DynamicCompositeKeyFactory
// ════════════════════════════════════════════

/// Builds dynamic composites for entity rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicCompositeKeyFactory;

impl DynamicCompositeKeyFactory {
    /// Column name of a keyed entry: the property name, then the key.
    pub fn create_for_insert(&self, meta: &PropertyMeta, key: &Value) -> CfmapResult<DynamicComposite> {
        let mut composite = self.create_for_property(meta)?;
        for (value, serializer) in insert_parts(meta, key)? {
            composite.push(&value, serializer)?;
        }
        Ok(composite)
    }

    /// Column name of a single-valued property.
    pub fn create_for_property(&self, meta: &PropertyMeta) -> CfmapResult<DynamicComposite> {
        let mut composite = DynamicComposite::new();
        composite.push(&Value::Text(meta.name().to_string()), Serializer::Utf8)?;
        Ok(composite)
    }

    /// Start and end bounds of a range within one property. An open side
    /// spans the whole property.
    pub fn create_for_query(
        &self,
        meta: &PropertyMeta,
        start: Option<&Value>,
        end: Option<&Value>,
        bounds: BoundingMode,
        ordering: WideMapOrdering,
    ) -> CfmapResult<(DynamicComposite, DynamicComposite)> {
        let (start_eq, end_eq) = bounds.equalities(ordering);
        let (start_open, end_open) = match ordering {
            WideMapOrdering::Ascending => (ComponentEquality::Equal, ComponentEquality::GreaterThanEqual),
            WideMapOrdering::Descending => (ComponentEquality::GreaterThanEqual, ComponentEquality::Equal),
        };
        let start = self.bound(meta, start, start_eq, start_open)?;
        let end = self.bound(meta, end, end_eq, end_open)?;
        Ok((start, end))
    }

    fn bound(
        &self,
        meta: &PropertyMeta,
        key: Option<&Value>,
        last: ComponentEquality,
        open: ComponentEquality,
    ) -> CfmapResult<DynamicComposite> {
        let name = Value::Text(meta.name().to_string());
        let mut composite = DynamicComposite::new();
        let Some(parts) = prefix_parts(meta, key)? else {
            composite.push_with_equality(&name, Serializer::Utf8, open)?;
            return Ok(composite);
        };
        composite.push(&name, Serializer::Utf8)?;
        let len = parts.len();
        for (i, (value, serializer)) in parts.into_iter().enumerate() {
            composite.push_with_equality(&value, serializer, equality_at(i, len, last))?;
        }
        Ok(composite)
    }
}
