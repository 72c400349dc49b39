//! Ordered and self-describing composite column names
//!
//! Both encodings are sequences of typed components. Each component carries
//! an end-of-component marker ([`ComponentEquality`]) that only matters for
//! range bounds: a prefix marked `GreaterThanEqual` sorts after every name
//! sharing that prefix, `LessThanEqual` before all of them.
//!
//! Wire format, per component:
//!
//! ```text
//! Composite:        | len: u16 | bytes | eoc: i8 |
//! DynamicComposite: | header | len: u16 | bytes | eoc: i8 |
//!   header = 0x8000 | alias          (u16, aliased types)
//!          | name_len: u16 | name    (other types)
//! ```

use crate::error::{CfmapError, CfmapResult};
use crate::serializer::Serializer;
use crate::value::Value;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// End-of-component marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum ComponentEquality {
    LessThanEqual = -1,
    Equal = 0,
    GreaterThanEqual = 1,
}

impl ComponentEquality {
    pub fn as_byte(self) -> u8 {
        (self as i8) as u8
    }

    pub fn from_byte(byte: u8) -> ComponentEquality {
        match byte as i8 {
            b if b < 0 => ComponentEquality::LessThanEqual,
            0 => ComponentEquality::Equal,
            _ => ComponentEquality::GreaterThanEqual,
        }
    }
}

/// One typed component of a composite name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    serializer: Serializer,
    bytes: Vec<u8>,
    equality: ComponentEquality,
}

impl Component {
    pub fn new(value: &Value, serializer: Serializer, equality: ComponentEquality) -> CfmapResult<Self> {
        Ok(Self {
            serializer,
            bytes: serializer.encode(value)?,
            equality,
        })
    }

    pub fn from_raw(serializer: Serializer, bytes: Vec<u8>, equality: ComponentEquality) -> Self {
        Self {
            serializer,
            bytes,
            equality,
        }
    }

    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn equality(&self) -> ComponentEquality {
        self.equality
    }

    /// Decodes through `serializer`, which may differ from the stored one
    /// when the caller knows better (ordered composites read back as bytes).
    pub fn value_as(&self, serializer: Serializer) -> CfmapResult<Value> {
        serializer.decode(&self.bytes)
    }

    pub fn value(&self) -> CfmapResult<Value> {
        self.value_as(self.serializer)
    }
}

type Components = SmallVec<[Component; 4]>;

/// Lexicographic comparison with end-of-component handling.
fn compare_components(a: &[Component], b: &[Component]) -> Ordering {
    for (ca, cb) in a.iter().zip(b.iter()) {
        let cmp = if ca.serializer == cb.serializer {
            ca.serializer.compare(&ca.bytes, &cb.bytes)
        } else {
            ca.serializer
                .comparator_type_name()
                .cmp(cb.serializer.comparator_type_name())
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
        let (ea, eb) = (ca.equality as i8, cb.equality as i8);
        if ea < 0 {
            if eb >= 0 {
                return Ordering::Less;
            }
        } else if ea > 0 {
            if eb <= 0 {
                return Ordering::Greater;
            }
        } else if eb != 0 {
            return if eb > 0 {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
    }
    a.len().cmp(&b.len())
}

fn push_short_len(out: &mut Vec<u8>, len: usize) -> CfmapResult<()> {
    let len = u16::try_from(len)
        .map_err(|_| CfmapError::Validation(format!("component of {len} bytes exceeds 65535")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> CfmapResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CfmapError::type_mismatch(
                format!("{n} more bytes of composite"),
                format!("{} bytes (truncated component)", self.remaining()),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn short(&mut self) -> CfmapResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn body(&mut self) -> CfmapResult<(Vec<u8>, ComponentEquality)> {
        let len = self.short()? as usize;
        let bytes = self.take(len)?.to_vec();
        let eoc = self.take(1)?[0];
        Ok((bytes, ComponentEquality::from_byte(eoc)))
    }
}

// ════════════════════════════════════════════
// Composite
// ════════════════════════════════════════════

/// Fixed-type ordered composite, used by wide-map column families.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Composite {
    components: Components,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: &Value, serializer: Serializer) -> CfmapResult<&mut Self> {
        self.push_with_equality(value, serializer, ComponentEquality::Equal)
    }

    pub fn push_with_equality(
        &mut self,
        value: &Value,
        serializer: Serializer,
        equality: ComponentEquality,
    ) -> CfmapResult<&mut Self> {
        self.components.push(Component::new(value, serializer, equality)?);
        Ok(self)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn to_bytes(&self) -> CfmapResult<Vec<u8>> {
        let mut out = Vec::new();
        for c in &self.components {
            push_short_len(&mut out, c.bytes.len())?;
            out.extend_from_slice(&c.bytes);
            out.push(c.equality.as_byte());
        }
        Ok(out)
    }

    /// Parses wire bytes; component types come from the comparator.
    pub fn from_bytes(bytes: &[u8], serializers: &[Serializer]) -> CfmapResult<Self> {
        let mut reader = Reader::new(bytes);
        let mut components = Components::new();
        let mut index = 0;
        while reader.remaining() > 0 {
            let serializer = *serializers.get(index).ok_or_else(|| {
                CfmapError::type_mismatch(
                    format!("{} components", serializers.len()),
                    format!("more than {index}"),
                )
            })?;
            let (raw, equality) = reader.body()?;
            if let Some(width) = serializer.fixed_width()
                && raw.len() != width
            {
                return Err(CfmapError::type_mismatch(
                    format!("{} ({width} bytes)", serializer.comparator_type_name()),
                    format!("{} bytes", raw.len()),
                ));
            }
            components.push(Component::from_raw(serializer, raw, equality));
            index += 1;
        }
        Ok(Self { components })
    }
}

impl Ord for Composite {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_components(&self.components, &other.components)
    }
}

impl PartialOrd for Composite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ════════════════════════════════════════════
// DynamicComposite
// ════════════════════════════════════════════

/// Self-describing composite, used by entity rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DynamicComposite {
    components: Components,
}

impl DynamicComposite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: &Value, serializer: Serializer) -> CfmapResult<&mut Self> {
        self.push_with_equality(value, serializer, ComponentEquality::Equal)
    }

    pub fn push_with_equality(
        &mut self,
        value: &Value,
        serializer: Serializer,
        equality: ComponentEquality,
    ) -> CfmapResult<&mut Self> {
        self.components.push(Component::new(value, serializer, equality)?);
        Ok(self)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn to_bytes(&self) -> CfmapResult<Vec<u8>> {
        let mut out = Vec::new();
        for c in &self.components {
            match c.serializer.alias() {
                Some(alias) => out.extend_from_slice(&(0x8000u16 | u16::from(alias)).to_be_bytes()),
                None => {
                    let name = c.serializer.comparator_type_name();
                    push_short_len(&mut out, name.len())?;
                    out.extend_from_slice(name.as_bytes());
                }
            }
            push_short_len(&mut out, c.bytes.len())?;
            out.extend_from_slice(&c.bytes);
            out.push(c.equality.as_byte());
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> CfmapResult<Self> {
        let mut reader = Reader::new(bytes);
        let mut components = Components::new();
        while reader.remaining() > 0 {
            let header = reader.short()?;
            let serializer = if header & 0x8000 != 0 {
                let alias = (header & 0xff) as u8;
                Serializer::from_alias(alias).ok_or_else(|| {
                    CfmapError::type_mismatch("known type alias", (alias as char).to_string())
                })?
            } else {
                let name = reader.take(header as usize)?;
                let name = std::str::from_utf8(name)
                    .map_err(|e| CfmapError::type_mismatch("type name", e.to_string()))?;
                Serializer::from_comparator_type_name(name)
                    .ok_or_else(|| CfmapError::type_mismatch("known comparator type", name))?
            };
            let (raw, equality) = reader.body()?;
            if let Some(width) = serializer.fixed_width()
                && raw.len() != width
            {
                return Err(CfmapError::type_mismatch(
                    format!("{} ({width} bytes)", serializer.comparator_type_name()),
                    format!("{} bytes", raw.len()),
                ));
            }
            components.push(Component::from_raw(serializer, raw, equality));
        }
        Ok(Self { components })
    }
}

impl Ord for DynamicComposite {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_components(&self.components, &other.components)
    }
}

impl PartialOrd for DynamicComposite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite(values: &[i64]) -> Composite {
        let mut c = Composite::new();
        for v in values {
            c.push(&Value::Long(*v), Serializer::Long).unwrap();
        }
        c
    }

    #[test]
    fn test_prefix_sorts_before_extension() {
        assert!(composite(&[1]) < composite(&[1, 0]));
        assert!(composite(&[1, 5]) < composite(&[2]));
    }

    #[test]
    fn test_greater_than_equal_prefix_sorts_after_extensions() {
        let mut bound = Composite::new();
        bound
            .push_with_equality(&Value::Long(1), Serializer::Long, ComponentEquality::GreaterThanEqual)
            .unwrap();
        assert!(bound > composite(&[1, i64::MAX]));
        assert!(bound < composite(&[2]));
    }

    #[test]
    fn test_less_than_equal_prefix_sorts_before_exact_match() {
        let mut bound = Composite::new();
        bound
            .push_with_equality(&Value::Long(1), Serializer::Long, ComponentEquality::LessThanEqual)
            .unwrap();
        assert!(bound < composite(&[1]));
        assert!(bound > composite(&[0, 9]));
    }

    #[test]
    fn test_composite_wire_round_trip() {
        let mut c = Composite::new();
        c.push(&Value::Int(7), Serializer::Int).unwrap();
        c.push(&Value::Text("abc".into()), Serializer::Utf8).unwrap();
        let bytes = c.to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 4, 0, 0, 0, 7, 0, 0, 3, b'a', b'b', b'c', 0]);
        let back = Composite::from_bytes(&bytes, &[Serializer::Int, Serializer::Utf8]).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_truncated_component_is_type_mismatch() {
        let bytes = vec![0, 8, 0, 0, 0, 1, 0];
        let err = Composite::from_bytes(&bytes, &[Serializer::Long]).unwrap_err();
        assert!(matches!(err, CfmapError::TypeMismatch { .. }));
    }

    #[test]
    fn test_wrong_width_component_is_type_mismatch() {
        // Well-formed frame, but 3 bytes where a long needs 8.
        let bytes = vec![0, 3, 1, 2, 3, 0];
        let err = Composite::from_bytes(&bytes, &[Serializer::Long]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: expected LongType (8 bytes), got 3 bytes"
        );
    }

    #[test]
    fn test_dynamic_composite_header_forms() {
        let mut c = DynamicComposite::new();
        c.push(&Value::Text("tweets".into()), Serializer::Utf8).unwrap();
        c.push(&Value::Int(3), Serializer::Int).unwrap();
        let bytes = c.to_bytes().unwrap();
        // Aliased UTF8 header, then a spelled-out Int32Type header.
        assert_eq!(&bytes[..2], &[0x80, b's']);
        let back = DynamicComposite::from_bytes(&bytes).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.get(1).unwrap().value().unwrap(), Value::Int(3));
    }

    #[test]
    fn test_dynamic_composite_unknown_alias() {
        let bytes = vec![0x80, b'z', 0, 1, 0, 0];
        assert!(DynamicComposite::from_bytes(&bytes).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_long_order_preserved(a in any::<i64>(), b in any::<i64>()) {
                prop_assert_eq!(composite(&[a]).cmp(&composite(&[b])), a.cmp(&b));
            }

            #[test]
            fn prop_multi_component_order_preserved(
                a in any::<(i64, String)>(),
                b in any::<(i64, String)>(),
            ) {
                let encode = |(n, s): &(i64, String)| {
                    let mut c = Composite::new();
                    c.push(&Value::Long(*n), Serializer::Long).unwrap();
                    c.push(&Value::Text(s.clone()), Serializer::Utf8).unwrap();
                    c
                };
                prop_assert_eq!(encode(&a).cmp(&encode(&b)), a.cmp(&b));
            }

            #[test]
            fn prop_wire_round_trip(values in prop::collection::vec(any::<i64>(), 1..6)) {
                let c = composite(&values);
                let serializers = vec![Serializer::Long; values.len()];
                let back = Composite::from_bytes(&c.to_bytes().unwrap(), &serializers).unwrap();
                prop_assert_eq!(back, c);
            }
        }
    }
}
