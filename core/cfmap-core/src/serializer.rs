//! Binary serializers for composite components and column values
//!
//! Each serializer knows its byte layout, its native ordering and the
//! comparator type name the store uses for it.

use crate::error::{CfmapError, CfmapResult};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Binary codec for one component or column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Serializer {
    Long,
    Int,
    Utf8,
    Uuid,
    TimeUuid,
    Boolean,
    Double,
    Float,
    Date,
    Bytes,
}

impl Serializer {
    /// Serializer for a value kind. Enums and opaque objects travel as UTF-8.
    pub fn for_kind(kind: &ValueKind) -> Serializer {
        match kind {
            ValueKind::Long => Serializer::Long,
            ValueKind::Int => Serializer::Int,
            ValueKind::Text | ValueKind::Enum(_) | ValueKind::Object(_) => Serializer::Utf8,
            ValueKind::Uuid => Serializer::Uuid,
            ValueKind::TimeUuid => Serializer::TimeUuid,
            ValueKind::Bool => Serializer::Boolean,
            ValueKind::Double => Serializer::Double,
            ValueKind::Float => Serializer::Float,
            ValueKind::Date => Serializer::Date,
            ValueKind::Bytes | ValueKind::MultiKey(_) | ValueKind::Entity(_) => Serializer::Bytes,
        }
    }

    /// Store-side comparator/validator type name.
    pub fn comparator_type_name(&self) -> &'static str {
        match self {
            Serializer::Long => "LongType",
            Serializer::Int => "Int32Type",
            Serializer::Utf8 => "UTF8Type",
            Serializer::Uuid => "UUIDType",
            Serializer::TimeUuid => "TimeUUIDType",
            Serializer::Boolean => "BooleanType",
            Serializer::Double => "DoubleType",
            Serializer::Float => "FloatType",
            Serializer::Date => "DateType",
            Serializer::Bytes => "BytesType",
        }
    }

    pub fn from_comparator_type_name(name: &str) -> Option<Serializer> {
        ALL.iter().copied().find(|s| s.comparator_type_name() == name)
    }

    /// One-byte alias used in dynamic composite headers.
    pub fn alias(&self) -> Option<u8> {
        match self {
            Serializer::Long => Some(b'l'),
            Serializer::Utf8 => Some(b's'),
            Serializer::Uuid => Some(b'u'),
            Serializer::TimeUuid => Some(b't'),
            Serializer::Bytes => Some(b'b'),
            _ => None,
        }
    }

    pub fn from_alias(alias: u8) -> Option<Serializer> {
        ALL.iter().copied().find(|s| s.alias() == Some(alias))
    }

    /// Every serializer that has a dynamic composite alias.
    pub fn aliased() -> impl Iterator<Item = (u8, Serializer)> {
        ALL.iter().filter_map(|s| s.alias().map(|a| (a, *s)))
    }

    /// Fixed width in bytes, `None` for variable-length layouts.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Serializer::Long | Serializer::Double | Serializer::Date => Some(8),
            Serializer::Int | Serializer::Float => Some(4),
            Serializer::Uuid | Serializer::TimeUuid => Some(16),
            Serializer::Boolean => Some(1),
            Serializer::Utf8 | Serializer::Bytes => None,
        }
    }

    pub fn encode(&self, value: &Value) -> CfmapResult<Vec<u8>> {
        let bytes = match (self, value) {
            (Serializer::Long, Value::Long(v)) | (Serializer::Date, Value::Date(v)) => {
                v.to_be_bytes().to_vec()
            }
            (Serializer::Int, Value::Int(v)) => v.to_be_bytes().to_vec(),
            (Serializer::Utf8, Value::Text(s)) | (Serializer::Utf8, Value::Enum(s)) => {
                s.as_bytes().to_vec()
            }
            (Serializer::Uuid, Value::Uuid(u)) | (Serializer::TimeUuid, Value::Uuid(u)) => {
                u.as_bytes().to_vec()
            }
            (Serializer::Boolean, Value::Bool(b)) => vec![u8::from(*b)],
            (Serializer::Double, Value::Double(v)) => v.to_be_bytes().to_vec(),
            (Serializer::Float, Value::Float(v)) => v.to_be_bytes().to_vec(),
            (Serializer::Bytes, Value::Bytes(b)) => b.clone(),
            (_, other) => {
                return Err(CfmapError::type_mismatch(
                    self.comparator_type_name(),
                    other.kind_name(),
                ));
            }
        };
        Ok(bytes)
    }

    pub fn decode(&self, bytes: &[u8]) -> CfmapResult<Value> {
        if let Some(width) = self.fixed_width()
            && bytes.len() != width
        {
            return Err(CfmapError::type_mismatch(
                format!("{} ({} bytes)", self.comparator_type_name(), width),
                format!("{} bytes", bytes.len()),
            ));
        }
        let value = match self {
            Serializer::Long => Value::Long(i64::from_be_bytes(fixed(bytes)?)),
            Serializer::Date => Value::Date(i64::from_be_bytes(fixed(bytes)?)),
            Serializer::Int => Value::Int(i32::from_be_bytes(fixed(bytes)?)),
            Serializer::Utf8 => Value::Text(String::from_utf8(bytes.to_vec()).map_err(|e| {
                CfmapError::type_mismatch("UTF8Type", e.to_string())
            })?),
            Serializer::Uuid | Serializer::TimeUuid => Value::Uuid(Uuid::from_slice(bytes)?),
            Serializer::Boolean => Value::Bool(bytes[0] != 0),
            Serializer::Double => Value::Double(f64::from_be_bytes(fixed(bytes)?)),
            Serializer::Float => Value::Float(f32::from_be_bytes(fixed(bytes)?)),
            Serializer::Bytes => Value::Bytes(bytes.to_vec()),
        };
        Ok(value)
    }

    /// Native ordering of two encoded values.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let numeric = match self {
            Serializer::Long | Serializer::Date => {
                both(a, b, |a: [u8; 8], b| i64::from_be_bytes(a).cmp(&i64::from_be_bytes(b)))
            }
            Serializer::Int => both(a, b, |a: [u8; 4], b| i32::from_be_bytes(a).cmp(&i32::from_be_bytes(b))),
            Serializer::Double => both(a, b, |a: [u8; 8], b| {
                f64::from_be_bytes(a).total_cmp(&f64::from_be_bytes(b))
            }),
            Serializer::Float => both(a, b, |a: [u8; 4], b| {
                f32::from_be_bytes(a).total_cmp(&f32::from_be_bytes(b))
            }),
            Serializer::TimeUuid => match (time_uuid_timestamp(a), time_uuid_timestamp(b)) {
                (Some(ta), Some(tb)) => Some(ta.cmp(&tb).then_with(|| a.cmp(b))),
                _ => None,
            },
            Serializer::Utf8 | Serializer::Uuid | Serializer::Boolean | Serializer::Bytes => None,
        };
        // Malformed widths fall back to byte order.
        numeric.unwrap_or_else(|| a.cmp(b))
    }
}

const ALL: [Serializer; 10] = [
    Serializer::Long,
    Serializer::Int,
    Serializer::Utf8,
    Serializer::Uuid,
    Serializer::TimeUuid,
    Serializer::Boolean,
    Serializer::Double,
    Serializer::Float,
    Serializer::Date,
    Serializer::Bytes,
];

fn fixed<const N: usize>(bytes: &[u8]) -> CfmapResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| CfmapError::type_mismatch(format!("{N} bytes"), format!("{} bytes", bytes.len())))
}

fn both<const N: usize>(
    a: &[u8],
    b: &[u8],
    cmp: impl FnOnce([u8; N], [u8; N]) -> Ordering,
) -> Option<Ordering> {
    Some(cmp(a.try_into().ok()?, b.try_into().ok()?))
}

/// 60-bit timestamp of a version 1 UUID.
fn time_uuid_timestamp(bytes: &[u8]) -> Option<u64> {
    if bytes.len() != 16 {
        return None;
    }
    let time_low = u64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    let time_mid = u64::from(u16::from_be_bytes([bytes[4], bytes[5]]));
    let time_hi = u64::from(u16::from_be_bytes([bytes[6], bytes[7]]) & 0x0fff);
    Some((time_hi << 48) | (time_mid << 32) | time_low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::{Timestamp, Uuid, timestamp::context::NoContext};

    #[test]
    fn test_long_ordering_is_numeric() {
        let s = Serializer::Long;
        let neg = s.encode(&Value::Long(-5)).unwrap();
        let pos = s.encode(&Value::Long(3)).unwrap();
        assert_eq!(s.compare(&neg, &pos), Ordering::Less);
        // Raw bytes of a negative number sort after a positive one.
        assert_eq!(neg.cmp(&pos), Ordering::Greater);
    }

    #[test]
    fn test_truncated_long_is_type_mismatch() {
        let err = Serializer::Long.decode(&[0, 0, 1]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: expected LongType (8 bytes), got 3 bytes"
        );
    }

    #[test]
    fn test_encode_rejects_wrong_value() {
        let err = Serializer::Int.encode(&Value::Text("x".into())).unwrap_err();
        assert!(matches!(err, CfmapError::TypeMismatch { .. }));
    }

    #[test]
    fn test_time_uuid_ordering_follows_timestamp() {
        let node = [1, 2, 3, 4, 5, 6];
        let early = Uuid::new_v1(Timestamp::from_unix(NoContext, 1_000, 0), &node);
        let late = Uuid::new_v1(Timestamp::from_unix(NoContext, 2_000, 0), &node);
        let s = Serializer::TimeUuid;
        assert_eq!(s.compare(early.as_bytes(), late.as_bytes()), Ordering::Less);
    }

    #[test]
    fn test_alias_lookup() {
        assert_eq!(Serializer::from_alias(b's'), Some(Serializer::Utf8));
        assert_eq!(Serializer::from_alias(b'z'), None);
        assert_eq!(
            Serializer::from_comparator_type_name("Int32Type"),
            Some(Serializer::Int)
        );
    }

    #[test]
    fn test_enum_and_object_travel_as_utf8() {
        assert_eq!(Serializer::for_kind(&ValueKind::Enum("S".into())), Serializer::Utf8);
        assert_eq!(Serializer::for_kind(&ValueKind::Object("P".into())), Serializer::Utf8);
    }
}
