//! Decoding of raw columns back into keys, values and ttls
//!
//! Ordered composite columns hold binary values written with the property's
//! value serializer. Dynamic composite columns hold the string form produced
//! by `PropertyMeta::write_value_to_string`.

use crate::error::{CfmapError, CfmapResult};
use crate::iterator::KeyValue;
use crate::metadata::PropertyMeta;
use crate::store::{Column, ColumnName, CounterColumn};
use crate::value::Value;

/// Key of a wide-map or collection column.
pub fn build_key(meta: &PropertyMeta, name: &ColumnName) -> CfmapResult<Value> {
    let components = name.components().get(name.key_offset()..).unwrap_or_default();

    if let Some(multi) = meta.multi_key_properties() {
        if components.len() != multi.len() {
            return Err(CfmapError::type_mismatch(
                format!("{} key components for property '{}'", multi.len(), meta.name()),
                format!("{} components", components.len()),
            ));
        }
        let values = components
            .iter()
            .zip(multi.component_serializers().iter().zip(multi.component_kinds()))
            .map(|(component, (serializer, kind))| kind.coerce(component.value_as(*serializer)?))
            .collect::<CfmapResult<Vec<_>>>()?;
        return Ok(Value::Components(values));
    }

    let serializer = meta.key_serializer().ok_or_else(|| {
        CfmapError::Unsupported(format!("The property '{}' has no key", meta.name()))
    })?;
    let component = components.first().ok_or_else(|| {
        CfmapError::type_mismatch(
            format!("a key component for property '{}'", meta.name()),
            "no components",
        )
    })?;
    let raw = component.value_as(serializer)?;
    match meta.key_kind() {
        Some(kind) => kind.coerce(raw),
        None => Ok(raw),
    }
}

/// Value of a column, cast into the property's value kind.
pub fn build_value(meta: &PropertyMeta, column: &Column) -> CfmapResult<Value> {
    match &column.name {
        ColumnName::Composite(_) => meta.cast_value(meta.value_serializer().decode(&column.value)?),
        ColumnName::Dynamic(_) => meta.get_value_from_string(utf8(&column.value)?),
    }
}

/// Stored join id of a join column, decoded with the target's id metadata.
pub fn build_raw_value(meta: &PropertyMeta, column: &Column) -> CfmapResult<Value> {
    let join_meta = meta.require_join_meta()?;
    let id_meta = join_meta.id_meta();
    match &column.name {
        ColumnName::Composite(_) => id_meta.cast_value(id_meta.value_serializer().decode(&column.value)?),
        ColumnName::Dynamic(_) => id_meta.get_value_from_string(utf8(&column.value)?),
    }
}

pub fn build_ttl(column: &Column) -> i32 {
    column.ttl
}

pub fn build_key_value(meta: &PropertyMeta, column: &Column) -> CfmapResult<KeyValue> {
    Ok(KeyValue::new(
        build_key(meta, &column.name)?,
        build_value(meta, column)?,
        build_ttl(column),
    ))
}

pub fn build_counter_key(meta: &PropertyMeta, column: &CounterColumn) -> CfmapResult<Value> {
    build_key(meta, &column.name)
}

pub fn build_counter_value(column: &CounterColumn) -> Value {
    Value::Long(column.value)
}

pub fn build_counter_key_value(meta: &PropertyMeta, column: &CounterColumn) -> CfmapResult<KeyValue> {
    Ok(KeyValue::new(
        build_counter_key(meta, column)?,
        build_counter_value(column),
        0,
    ))
}

/// Encodes a value for an ordered composite column.
pub fn encode_value(meta: &PropertyMeta, value: &Value) -> CfmapResult<Vec<u8>> {
    meta.value_serializer()
        .encode(&meta.write_value_as_supported_type_or_string(value))
}

fn utf8(bytes: &[u8]) -> CfmapResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| CfmapError::type_mismatch("UTF-8 text", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{CompositeKeyFactory, DynamicCompositeKeyFactory};
    use crate::metadata::{MultiKeyProperties, PropertyType};
    use crate::value::{KeyComponent, ValueKind};

    fn wide_map(key: ValueKind, value: ValueKind) -> PropertyMeta {
        PropertyMeta::builder("entries")
            .key_kind(key)
            .value_kind(value)
            .build(PropertyType::WideMap)
            .unwrap()
    }

    #[test]
    fn test_composite_key_and_value() {
        let meta = wide_map(ValueKind::Int, ValueKind::Long);
        let name = CompositeKeyFactory.create_for_insert(&meta, &Value::Int(4)).unwrap();
        let column = Column {
            name: name.into(),
            value: encode_value(&meta, &Value::Long(40)).unwrap(),
            ttl: 10,
        };
        let kv = build_key_value(&meta, &column).unwrap();
        assert_eq!(kv.key(), &Value::Int(4));
        assert_eq!(kv.value(), &Value::Long(40));
        assert_eq!(kv.ttl(), 10);
    }

    #[test]
    fn test_dynamic_key_skips_property_name() {
        let meta = wide_map(ValueKind::Text, ValueKind::Object("Address".into()));
        let name = DynamicCompositeKeyFactory
            .create_for_insert(&meta, &Value::Text("home".into()))
            .unwrap();
        let value = Value::Object(serde_json::json!({"city": "Paris"}));
        let column = Column {
            name: name.into(),
            value: meta.write_value_to_string(&value).into_bytes(),
            ttl: 0,
        };
        assert_eq!(build_key(&meta, &column.name).unwrap(), Value::Text("home".into()));
        assert_eq!(build_value(&meta, &column).unwrap(), value);
    }

    #[test]
    fn test_enum_value_round_trip_through_composite() {
        let meta = wide_map(ValueKind::Long, ValueKind::Enum("Status".into()));
        let name = CompositeKeyFactory.create_for_insert(&meta, &Value::Long(1)).unwrap();
        let column = Column {
            name: name.into(),
            value: encode_value(&meta, &Value::Enum("ACTIVE".into())).unwrap(),
            ttl: 0,
        };
        assert_eq!(build_value(&meta, &column).unwrap(), Value::Enum("ACTIVE".into()));
    }

    #[test]
    fn test_multi_key_decoding() {
        let multi = MultiKeyProperties::from_components(
            "Key",
            vec![
                KeyComponent { name: "a".into(), order: 1, kind: ValueKind::Text },
                KeyComponent { name: "b".into(), order: 2, kind: ValueKind::Long },
            ],
        )
        .unwrap();
        let meta = PropertyMeta::builder("entries")
            .key_kind(ValueKind::MultiKey("Key".into()))
            .value_kind(ValueKind::Text)
            .multi_key(Some(multi))
            .build(PropertyType::WideMap)
            .unwrap();
        let key = Value::Components(vec![Value::Text("x".into()), Value::Long(2)]);
        let name = CompositeKeyFactory.create_for_insert(&meta, &key).unwrap();
        assert_eq!(build_key(&meta, &ColumnName::from(name)).unwrap(), key);
    }

    #[test]
    fn test_counter_value() {
        let meta = wide_map(ValueKind::Text, ValueKind::Long);
        let name = CompositeKeyFactory
            .create_for_insert(&meta, &Value::Text("clicks".into()))
            .unwrap();
        let column = CounterColumn {
            name: name.into(),
            value: 17,
        };
        let kv = build_counter_key_value(&meta, &column).unwrap();
        assert_eq!(kv.value(), &Value::Long(17));
        assert_eq!(kv.ttl(), 0);
    }

    #[test]
    fn test_join_value_without_resolved_target_fails() {
        let meta = PropertyMeta::builder("authors")
            .key_kind(ValueKind::Long)
            .value_kind(ValueKind::Entity("User".into()))
            .join(crate::metadata::JoinProperties::new("User", []))
            .build(PropertyType::JoinWideMap)
            .unwrap();
        let name = CompositeKeyFactory.create_for_insert(&meta, &Value::Long(1)).unwrap();
        let column = Column {
            name: name.into(),
            value: 5i64.to_be_bytes().to_vec(),
            ttl: 0,
        };
        let err = build_raw_value(&meta, &column).unwrap_err();
        assert_eq!(err.to_string(), "Cannot find mapping for join entity 'User'");
    }
}
