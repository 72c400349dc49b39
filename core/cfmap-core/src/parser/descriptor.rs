//! Declarative entity descriptions
//!
//! An [`EntityDescriptor`] is what `#[derive(Entity)]` generates, and what
//! hand-written mappings build with the same builder methods.

use crate::consistency::ConsistencyLevels;
use crate::metadata::{Accessors, CascadeType};
use crate::value::{KeyComponent, ValueKind, ValueType};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// A mapped entity type.
pub trait Entity: Any + Send + Sync {
    /// Fully qualified type name, e.g. `app::model::User`.
    const CLASS_NAME: &'static str;

    fn descriptor() -> EntityDescriptor
    where
        Self: Sized;
}

/// Field type of a wide map property.
///
/// Entries live in their own columns and are never loaded with the entity,
/// so the field itself holds no data.
pub struct WideMap<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> WideMap<K, V> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K, V> Default for WideMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for WideMap<K, V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for WideMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WideMap")
    }
}

/// Declared shape of a field, inferred from its Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Scalar(ValueKind),
    List(ValueKind),
    Set(ValueKind),
    Map {
        key: ValueKind,
        value: ValueKind,
    },
    WideMap {
        key: ValueKind,
        /// Components of a multi-component key, `None` for a scalar key
        key_components: Option<Vec<KeyComponent>>,
        value: ValueKind,
    },
}

impl FieldShape {
    pub fn scalar<T: ValueType>() -> Self {
        FieldShape::Scalar(T::kind())
    }

    pub fn list<T: ValueType>() -> Self {
        FieldShape::List(T::kind())
    }

    pub fn set<T: ValueType>() -> Self {
        FieldShape::Set(T::kind())
    }

    pub fn map<K: ValueType, V: ValueType>() -> Self {
        FieldShape::Map {
            key: K::kind(),
            value: V::kind(),
        }
    }

    pub fn wide_map<K: ValueType, V: ValueType>() -> Self {
        FieldShape::WideMap {
            key: K::kind(),
            key_components: K::key_components(),
            value: V::kind(),
        }
    }

    /// Single join reference to entity `E`.
    pub fn join<E: Entity>() -> Self {
        FieldShape::Scalar(ValueKind::Entity(E::CLASS_NAME.to_string()))
    }

    /// Wide map of join references to entity `E`.
    pub fn join_wide_map<K: ValueType, E: Entity>() -> Self {
        FieldShape::WideMap {
            key: K::kind(),
            key_components: K::key_components(),
            value: ValueKind::Entity(E::CLASS_NAME.to_string()),
        }
    }

    pub fn value_kind(&self) -> &ValueKind {
        match self {
            FieldShape::Scalar(kind) | FieldShape::List(kind) | FieldShape::Set(kind) => kind,
            FieldShape::Map { value, .. } | FieldShape::WideMap { value, .. } => value,
        }
    }
}

/// `#[cfmap(column(..))]` options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMarker {
    /// Property name, defaults to the field name
    pub name: Option<String>,
    /// External column family of a wide map
    pub table: Option<String>,
}

/// `#[cfmap(join_column(..))]` options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinMarker {
    pub name: Option<String>,
    pub table: Option<String>,
    pub cascade: Vec<CascadeType>,
}

/// Mapping attribute of a field. Id takes precedence over column, column
/// over join column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMarker {
    Id,
    Column(ColumnMarker),
    JoinColumn(JoinMarker),
}

/// One mapped field.
#[derive(Clone)]
pub struct FieldDescriptor {
    field_name: String,
    marker: FieldMarker,
    shape: FieldShape,
    lazy: bool,
    counter: bool,
    consistency: Option<ConsistencyLevels>,
    accessors: Option<Accessors>,
}

impl FieldDescriptor {
    pub fn new(field_name: impl Into<String>, marker: FieldMarker, shape: FieldShape) -> Self {
        Self {
            field_name: field_name.into(),
            marker,
            shape,
            lazy: false,
            counter: false,
            consistency: None,
            accessors: None,
        }
    }

    pub fn id(field_name: impl Into<String>, shape: FieldShape) -> Self {
        Self::new(field_name, FieldMarker::Id, shape)
    }

    pub fn column(field_name: impl Into<String>, shape: FieldShape) -> Self {
        Self::new(field_name, FieldMarker::Column(ColumnMarker::default()), shape)
    }

    pub fn join_column(field_name: impl Into<String>, shape: FieldShape) -> Self {
        Self::new(field_name, FieldMarker::JoinColumn(JoinMarker::default()), shape)
    }

    /// Overrides the property name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        match &mut self.marker {
            FieldMarker::Column(column) => column.name = Some(name.into()),
            FieldMarker::JoinColumn(join) => join.name = Some(name.into()),
            FieldMarker::Id => {}
        }
        self
    }

    /// Stores a wide map in its own column family.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        match &mut self.marker {
            FieldMarker::Column(column) => column.table = Some(table.into()),
            FieldMarker::JoinColumn(join) => join.table = Some(table.into()),
            FieldMarker::Id => {}
        }
        self
    }

    pub fn cascade(mut self, cascade: impl IntoIterator<Item = CascadeType>) -> Self {
        if let FieldMarker::JoinColumn(join) = &mut self.marker {
            join.cascade.extend(cascade);
        }
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn counter(mut self) -> Self {
        self.counter = true;
        self
    }

    pub fn consistency(mut self, levels: ConsistencyLevels) -> Self {
        self.consistency = Some(levels);
        self
    }

    pub fn accessors(mut self, accessors: Accessors) -> Self {
        self.accessors = Some(accessors);
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Property name: the declared column name, else the field name.
    pub fn property_name(&self) -> &str {
        let declared = match &self.marker {
            FieldMarker::Column(column) => column.name.as_deref(),
            FieldMarker::JoinColumn(join) => join.name.as_deref(),
            FieldMarker::Id => None,
        };
        declared.unwrap_or(&self.field_name)
    }

    pub fn marker(&self) -> &FieldMarker {
        &self.marker
    }

    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_counter(&self) -> bool {
        self.counter
    }

    pub fn consistency_levels(&self) -> Option<ConsistencyLevels> {
        self.consistency
    }

    pub fn field_accessors(&self) -> Option<&Accessors> {
        self.accessors.as_ref()
    }

    fn lift<P: Any, B: Any>(mut self, project: fn(&P) -> &B, project_mut: fn(&mut P) -> &mut B) -> Self {
        self.accessors = self.accessors.map(|a| a.lift(project, project_mut));
        self
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("field_name", &self.field_name)
            .field("marker", &self.marker)
            .field("shape", &self.shape)
            .field("lazy", &self.lazy)
            .field("counter", &self.counter)
            .field("consistency", &self.consistency)
            .field("accessors", &self.accessors.is_some())
            .finish()
    }
}

/// Mapping declaration of one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    class_name: String,
    table: Option<String>,
    column_family_direct_mapping: bool,
    serial_version_uid: Option<i64>,
    consistency: Option<ConsistencyLevels>,
    fields: Vec<FieldDescriptor>,
    parent: Option<Box<EntityDescriptor>>,
}

impl EntityDescriptor {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            table: None,
            column_family_direct_mapping: false,
            serial_version_uid: None,
            consistency: None,
            fields: Vec::new(),
            parent: None,
        }
    }

    pub fn of<E: Entity>() -> Self {
        E::descriptor()
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Maps the entity's single wide map onto the whole column family.
    pub fn column_family(mut self) -> Self {
        self.column_family_direct_mapping = true;
        self
    }

    pub fn serial_version_uid(mut self, uid: i64) -> Self {
        self.serial_version_uid = Some(uid);
        self
    }

    pub fn consistency(mut self, levels: ConsistencyLevels) -> Self {
        self.consistency = Some(levels);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Fields inherited from an embedded base type.
    pub fn parent(mut self, parent: EntityDescriptor) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Re-targets every accessor onto an outer type embedding this one.
    pub fn lift<P: Any, B: Any>(mut self, project: fn(&P) -> &B, project_mut: fn(&mut P) -> &mut B) -> Self {
        self.fields = self
            .fields
            .into_iter()
            .map(|f| f.lift(project, project_mut))
            .collect();
        self.parent = self.parent.map(|p| Box::new(p.lift(project, project_mut)));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Last path segment of the class name.
    pub fn simple_name(&self) -> &str {
        self.class_name.rsplit("::").next().unwrap_or(&self.class_name)
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_column_family_direct_mapping(&self) -> bool {
        self.column_family_direct_mapping
    }

    pub fn serial_version_uid_value(&self) -> Option<i64> {
        self.serial_version_uid
    }

    pub fn consistency_levels(&self) -> Option<ConsistencyLevels> {
        self.consistency
    }

    /// Own fields, without inherited ones.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn parent_descriptor(&self) -> Option<&EntityDescriptor> {
        self.parent.as_deref()
    }

    /// Inherited fields first, root of the chain first.
    pub fn all_fields(&self) -> Vec<&FieldDescriptor> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(descriptor) = current {
            chain.push(descriptor);
            current = descriptor.parent_descriptor();
        }
        chain.iter().rev().flat_map(|d| d.fields.iter()).collect()
    }
}
