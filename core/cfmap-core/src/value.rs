//! Dynamic values and the Rust type mapping
//!
//! [`Value`] is what flows through metadata helpers, the composite codec and
//! the key/value factories. [`ValueKind`] is the semantic class of a property
//! key or value. [`ValueType`] connects Rust field types to both.

use crate::error::{CfmapError, CfmapResult};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// ════════════════════════════════════════════
// ValueKind
// ════════════════════════════════════════════

/// Semantic class of a key or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Long,
    Int,
    Text,
    Uuid,
    TimeUuid,
    Bool,
    Double,
    Float,
    /// Milliseconds since the Unix epoch
    Date,
    Bytes,
    /// Enum type stored by variant name
    Enum(String),
    /// Opaque serde type stored as JSON text
    Object(String),
    /// Multi-component wide-map key
    MultiKey(String),
    /// Join target entity class
    Entity(String),
}

impl ValueKind {
    /// Whether values of this kind are stored without a JSON wrapper.
    pub fn is_native(&self) -> bool {
        !matches!(
            self,
            ValueKind::Object(_) | ValueKind::MultiKey(_) | ValueKind::Entity(_)
        )
    }

    /// Display name used in error messages.
    pub fn name(&self) -> String {
        match self {
            ValueKind::Long => "i64".to_string(),
            ValueKind::Int => "i32".to_string(),
            ValueKind::Text => "String".to_string(),
            ValueKind::Uuid => "Uuid".to_string(),
            ValueKind::TimeUuid => "TimeUuid".to_string(),
            ValueKind::Bool => "bool".to_string(),
            ValueKind::Double => "f64".to_string(),
            ValueKind::Float => "f32".to_string(),
            ValueKind::Date => "SystemTime".to_string(),
            ValueKind::Bytes => "Vec<u8>".to_string(),
            ValueKind::Enum(name)
            | ValueKind::Object(name)
            | ValueKind::MultiKey(name)
            | ValueKind::Entity(name) => name.clone(),
        }
    }

    /// Whether `value` already has the runtime shape of this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::Long, Value::Long(_))
                | (ValueKind::Int, Value::Int(_))
                | (ValueKind::Text, Value::Text(_))
                | (ValueKind::Uuid, Value::Uuid(_))
                | (ValueKind::TimeUuid, Value::Uuid(_))
                | (ValueKind::Bool, Value::Bool(_))
                | (ValueKind::Double, Value::Double(_))
                | (ValueKind::Float, Value::Float(_))
                | (ValueKind::Date, Value::Date(_))
                | (ValueKind::Bytes, Value::Bytes(_))
                | (ValueKind::Enum(_), Value::Enum(_))
                | (ValueKind::Object(_), Value::Object(_))
                | (ValueKind::MultiKey(_), Value::Components(_))
        )
    }

    /// Coerces a decoded value into this kind.
    ///
    /// Text decoded from a UTF-8 component becomes an enum variant for enum
    /// kinds and goes through JSON for opaque kinds. Everything else must
    /// already match.
    pub fn coerce(&self, value: Value) -> CfmapResult<Value> {
        if self.accepts(&value) {
            return Ok(value);
        }
        match (self, value) {
            (ValueKind::Enum(_), Value::Text(name)) => Ok(Value::Enum(name)),
            (ValueKind::Object(_), Value::Text(json)) => {
                Ok(Value::Object(serde_json::from_str(&json).map_err(|e| {
                    CfmapError::type_mismatch(self.name(), e.to_string())
                })?))
            }
            (_, other) => Err(CfmapError::type_mismatch(self.name(), other.kind_name())),
        }
    }

    /// Builds a value of this kind from its JSON representation.
    pub fn from_json(&self, json: serde_json::Value) -> CfmapResult<Value> {
        let mismatch = |json: &serde_json::Value| CfmapError::type_mismatch(self.name(), json.to_string());
        let value = match self {
            ValueKind::Long | ValueKind::Date => {
                let v = json.as_i64().ok_or_else(|| mismatch(&json))?;
                if *self == ValueKind::Long {
                    Value::Long(v)
                } else {
                    Value::Date(v)
                }
            }
            ValueKind::Int => {
                let v = json.as_i64().ok_or_else(|| mismatch(&json))?;
                Value::Int(i32::try_from(v).map_err(|_| mismatch(&json))?)
            }
            ValueKind::Text => Value::Text(json.as_str().ok_or_else(|| mismatch(&json))?.to_string()),
            ValueKind::Uuid | ValueKind::TimeUuid => {
                let s = json.as_str().ok_or_else(|| mismatch(&json))?;
                Value::Uuid(Uuid::parse_str(s)?)
            }
            ValueKind::Bool => Value::Bool(json.as_bool().ok_or_else(|| mismatch(&json))?),
            ValueKind::Double => Value::Double(json.as_f64().ok_or_else(|| mismatch(&json))?),
            ValueKind::Float => Value::Float(json.as_f64().ok_or_else(|| mismatch(&json))? as f32),
            ValueKind::Bytes => Value::Bytes(serde_json::from_value(json)?),
            ValueKind::Enum(_) => Value::Enum(json.as_str().ok_or_else(|| mismatch(&json))?.to_string()),
            ValueKind::Object(_) => Value::Object(json),
            ValueKind::MultiKey(_) | ValueKind::Entity(_) => {
                return Err(CfmapError::Unsupported(format!(
                    "'{}' values cannot be decoded from JSON",
                    self.name()
                )));
            }
        };
        Ok(value)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ════════════════════════════════════════════
// Value
// ════════════════════════════════════════════

/// Dynamically typed property value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch
    Date(i64),
    Enum(String),
    Bytes(Vec<u8>),
    Object(serde_json::Value),
    /// Multi-key components in declared order
    Components(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short runtime type name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "i32",
            Value::Long(_) => "i64",
            Value::Float(_) => "f32",
            Value::Double(_) => "f64",
            Value::Text(_) => "String",
            Value::Uuid(_) => "Uuid",
            Value::Date(_) => "date",
            Value::Enum(_) => "enum",
            Value::Bytes(_) => "bytes",
            Value::Object(_) => "object",
            Value::Components(_) => "multi-key",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) | Value::Date(v) => Some(*v),
            Value::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int(v) => Json::from(*v),
            Value::Long(v) | Value::Date(v) => Json::from(*v),
            Value::Float(v) => Json::from(*v),
            Value::Double(v) => Json::from(*v),
            Value::Text(s) | Value::Enum(s) => Json::String(s.clone()),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Bytes(b) => Json::Array(b.iter().map(|x| Json::from(*x)).collect()),
            Value::Object(json) => json.clone(),
            Value::Components(items) | Value::List(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Array(
                entries
                    .iter()
                    .map(|(k, v)| Json::Array(vec![k.to_json(), v.to_json()]))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Components(a), Value::Components(b))
            | (Value::List(a), Value::List(b))
            | (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) | Value::Date(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Text(s) | Value::Enum(s) => s.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Object(json) => json.to_string().hash(state),
            Value::Components(items) | Value::List(items) | Value::Set(items) => items.hash(state),
            Value::Map(entries) => entries.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) | Value::Enum(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Text,
    &str => Text,
    Uuid => Uuid,
    Vec<u8> => Bytes,
}

// ════════════════════════════════════════════
// ValueType: Rust type → Value
// ════════════════════════════════════════════

/// One component of a multi-component key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComponent {
    pub name: String,
    pub order: u32,
    pub kind: ValueKind,
}

/// Rust types that map onto a [`ValueKind`].
pub trait ValueType: Sized {
    fn kind() -> ValueKind;
    /// Fails only for types whose conversion can fail (serde-backed ones).
    fn into_value(self) -> CfmapResult<Value>;
    fn from_value(value: Value) -> CfmapResult<Self>;

    /// Declared components when the type is a multi-component key.
    fn key_components() -> Option<Vec<KeyComponent>> {
        None
    }
}

macro_rules! impl_value_type {
    ($($ty:ty => $kind:ident / $variant:ident),* $(,)?) => {
        $(
            impl ValueType for $ty {
                fn kind() -> ValueKind {
                    ValueKind::$kind
                }

                fn into_value(self) -> CfmapResult<Value> {
                    Ok(Value::$variant(self))
                }

                fn from_value(value: Value) -> CfmapResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(CfmapError::type_mismatch(stringify!($ty), other.kind_name())),
                    }
                }
            }
        )*
    };
}

impl_value_type! {
    i64 => Long / Long,
    i32 => Int / Int,
    String => Text / Text,
    Uuid => Uuid / Uuid,
    bool => Bool / Bool,
    f64 => Double / Double,
    f32 => Float / Float,
    Vec<u8> => Bytes / Bytes,
}

impl ValueType for SystemTime {
    fn kind() -> ValueKind {
        ValueKind::Date
    }

    fn into_value(self) -> CfmapResult<Value> {
        let millis = match self.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        };
        Ok(Value::Date(millis))
    }

    fn from_value(value: Value) -> CfmapResult<Self> {
        match value {
            Value::Date(ms) if ms >= 0 => Ok(UNIX_EPOCH + Duration::from_millis(ms as u64)),
            Value::Date(ms) => Ok(UNIX_EPOCH - Duration::from_millis(ms.unsigned_abs())),
            other => Err(CfmapError::type_mismatch("SystemTime", other.kind_name())),
        }
    }
}

/// Version 1 UUID ordered by its embedded timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeUuid(pub Uuid);

impl ValueType for TimeUuid {
    fn kind() -> ValueKind {
        ValueKind::TimeUuid
    }

    fn into_value(self) -> CfmapResult<Value> {
        Ok(Value::Uuid(self.0))
    }

    fn from_value(value: Value) -> CfmapResult<Self> {
        match value {
            Value::Uuid(u) => Ok(TimeUuid(u)),
            other => Err(CfmapError::type_mismatch("TimeUuid", other.kind_name())),
        }
    }
}

/// Opaque serde type stored as JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> ValueType for Json<T> {
    fn kind() -> ValueKind {
        ValueKind::Object(std::any::type_name::<T>().to_string())
    }

    fn into_value(self) -> CfmapResult<Value> {
        Ok(Value::Object(serde_json::to_value(&self.0)?))
    }

    fn from_value(value: Value) -> CfmapResult<Self> {
        match value {
            Value::Object(json) => Ok(Json(serde_json::from_value(json)?)),
            Value::Text(text) => Ok(Json(serde_json::from_str(&text)?)),
            other => Err(CfmapError::type_mismatch(
                std::any::type_name::<T>(),
                other.kind_name(),
            )),
        }
    }
}

/// Implements [`ValueType`] for a fieldless enum, stored by variant name.
///
/// ```rust
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Active, Closed }
/// cfmap_core::enum_value_type!(Status { Active, Closed });
/// ```
#[macro_export]
macro_rules! enum_value_type {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::value::ValueType for $ty {
            fn kind() -> $crate::value::ValueKind {
                $crate::value::ValueKind::Enum(stringify!($ty).to_string())
            }

            fn into_value(self) -> $crate::error::CfmapResult<$crate::value::Value> {
                Ok(match self {
                    $($ty::$variant => $crate::value::Value::Enum(stringify!($variant).to_string()),)+
                })
            }

            fn from_value(value: $crate::value::Value) -> $crate::error::CfmapResult<Self> {
                match value.as_str() {
                    $(Some(stringify!($variant)) => Ok($ty::$variant),)+
                    _ => Err($crate::error::CfmapError::type_mismatch(
                        stringify!($ty),
                        value.to_string(),
                    )),
                }
            }
        }
    };
}

// ════════════════════════════════════════════
// Field access helpers used by generated accessors
// ════════════════════════════════════════════

/// Conversions between entity fields and [`Value`]s, one per field shape.
pub mod access {
    use super::*;

    pub fn get_simple<T: ValueType + Clone>(field: &T) -> CfmapResult<Option<Value>> {
        field.clone().into_value().map(Some)
    }

    pub fn set_simple<T: ValueType>(field: &mut T, value: Value) -> CfmapResult<()> {
        *field = T::from_value(value)?;
        Ok(())
    }

    pub fn get_option<T: ValueType + Clone>(field: &Option<T>) -> CfmapResult<Option<Value>> {
        field.clone().map(T::into_value).transpose()
    }

    pub fn set_option<T: ValueType>(field: &mut Option<T>, value: Value) -> CfmapResult<()> {
        *field = match value {
            Value::Null => None,
            other => Some(T::from_value(other)?),
        };
        Ok(())
    }

    pub fn get_list<T: ValueType + Clone>(field: &[T]) -> CfmapResult<Option<Value>> {
        let items = field.iter().cloned().map(T::into_value).collect::<CfmapResult<_>>()?;
        Ok(Some(Value::List(items)))
    }

    pub fn set_list<T: ValueType>(field: &mut Vec<T>, value: Value) -> CfmapResult<()> {
        *field = match value {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect::<CfmapResult<_>>()?
            }
            Value::Null => Vec::new(),
            other => return Err(CfmapError::type_mismatch("list", other.kind_name())),
        };
        Ok(())
    }

    pub fn get_set<T, S>(field: &HashSet<T, S>) -> CfmapResult<Option<Value>>
    where
        T: ValueType + Clone,
    {
        let items = field.iter().cloned().map(T::into_value).collect::<CfmapResult<_>>()?;
        Ok(Some(Value::Set(items)))
    }

    pub fn set_set<T, S>(field: &mut HashSet<T, S>, value: Value) -> CfmapResult<()>
    where
        T: ValueType + Eq + Hash,
        S: BuildHasher + Default,
    {
        *field = match value {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect::<CfmapResult<_>>()?
            }
            Value::Null => HashSet::default(),
            other => return Err(CfmapError::type_mismatch("set", other.kind_name())),
        };
        Ok(())
    }

    pub fn get_map<K, V, S>(field: &HashMap<K, V, S>) -> CfmapResult<Option<Value>>
    where
        K: ValueType + Clone,
        V: ValueType + Clone,
    {
        let entries = field
            .iter()
            .map(|(k, v)| Ok((k.clone().into_value()?, v.clone().into_value()?)))
            .collect::<CfmapResult<_>>()?;
        Ok(Some(Value::Map(entries)))
    }

    pub fn set_map<K, V, S>(field: &mut HashMap<K, V, S>, value: Value) -> CfmapResult<()>
    where
        K: ValueType + Eq + Hash,
        V: ValueType,
        S: BuildHasher + Default,
    {
        *field = match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect::<CfmapResult<_>>()?,
            Value::Null => HashMap::default(),
            other => return Err(CfmapError::type_mismatch("map", other.kind_name())),
        };
        Ok(())
    }
}
