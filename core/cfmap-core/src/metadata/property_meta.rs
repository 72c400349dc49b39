//! Per-field mapping metadata

use super::entity_meta::EntityMeta;
use super::property_type::PropertyType;
use crate::consistency::ConsistencyLevels;
use crate::dao::{CounterDao, GenericCompositeDao};
use crate::error::{CfmapError, CfmapResult};
use crate::serializer::Serializer;
use crate::value::{KeyComponent, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

// ════════════════════════════════════════════
// Accessors
// ════════════════════════════════════════════

/// Reads a field from an entity instance.
pub type Getter = Arc<dyn Fn(&dyn Any) -> CfmapResult<Option<Value>> + Send + Sync>;

/// Writes a field on an entity instance.
pub type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> CfmapResult<()> + Send + Sync>;

/// Getter/setter pair of a mapped field.
#[derive(Clone)]
pub struct Accessors {
    pub getter: Getter,
    pub setter: Setter,
}

impl Accessors {
    /// Builds accessors for a field of entity type `E`.
    pub fn of<E, G, S>(get: G, set: S) -> Self
    where
        E: Any,
        G: Fn(&E) -> CfmapResult<Option<Value>> + Send + Sync + 'static,
        S: Fn(&mut E, Value) -> CfmapResult<()> + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |entity: &dyn Any| {
            let entity = entity
                .downcast_ref::<E>()
                .ok_or_else(|| CfmapError::type_mismatch(std::any::type_name::<E>(), "other entity type"))?;
            get(entity)
        });
        let setter: Setter = Arc::new(move |entity: &mut dyn Any, value| {
            let entity = entity
                .downcast_mut::<E>()
                .ok_or_else(|| CfmapError::type_mismatch(std::any::type_name::<E>(), "other entity type"))?;
            set(entity, value)
        });
        Self { getter, setter }
    }

    /// Re-targets accessors of an embedded base struct onto the outer type.
    pub fn lift<P, B>(self, project: fn(&P) -> &B, project_mut: fn(&mut P) -> &mut B) -> Self
    where
        P: Any,
        B: Any,
    {
        let Accessors { getter, setter } = self;
        let lifted_getter: Getter = Arc::new(move |entity: &dyn Any| {
            let outer = entity
                .downcast_ref::<P>()
                .ok_or_else(|| CfmapError::type_mismatch(std::any::type_name::<P>(), "other entity type"))?;
            getter(project(outer) as &dyn Any)
        });
        let lifted_setter: Setter = Arc::new(move |entity: &mut dyn Any, value| {
            let outer = entity
                .downcast_mut::<P>()
                .ok_or_else(|| CfmapError::type_mismatch(std::any::type_name::<P>(), "other entity type"))?;
            setter(project_mut(outer) as &mut dyn Any, value)
        });
        Self {
            getter: lifted_getter,
            setter: lifted_setter,
        }
    }
}

impl fmt::Debug for Accessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessors { .. }")
    }
}

// ════════════════════════════════════════════
// Property blocks
// ════════════════════════════════════════════

/// Operations propagated from an entity to its join targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeType {
    Persist,
    Merge,
    Remove,
    Refresh,
    All,
}

impl std::str::FromStr for CascadeType {
    type Err = CfmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persist" => Ok(CascadeType::Persist),
            "merge" => Ok(CascadeType::Merge),
            "remove" => Ok(CascadeType::Remove),
            "refresh" => Ok(CascadeType::Refresh),
            "all" => Ok(CascadeType::All),
            other => Err(CfmapError::bean_mapping(format!(
                "Unknown cascade type '{other}'"
            ))),
        }
    }
}

/// Components of a multi-component wide-map key, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiKeyProperties {
    type_name: String,
    component_names: Vec<String>,
    component_kinds: Vec<ValueKind>,
    component_serializers: Vec<Serializer>,
}

impl MultiKeyProperties {
    /// Validates `#[key(order = n)]` declarations and sorts them.
    pub fn from_components(
        type_name: impl Into<String>,
        mut components: Vec<KeyComponent>,
    ) -> CfmapResult<Self> {
        let type_name = type_name.into();
        if components.is_empty() {
            return Err(CfmapError::bean_mapping(format!(
                "The multi-key class '{type_name}' should have at least one component annotated with #[key(order = n)]"
            )));
        }
        components.sort_by_key(|c| c.order);
        for pair in components.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(CfmapError::bean_mapping(format!(
                    "The order '{}' is duplicated in multi-key class '{type_name}'",
                    pair[0].order
                )));
            }
        }
        for (expected, component) in (1u32..).zip(components.iter()) {
            if component.order != expected {
                return Err(CfmapError::bean_mapping(format!(
                    "The key orders of multi-key class '{type_name}' should be contiguous from 1, found '{}' at position {expected}",
                    component.order
                )));
            }
            if !component.kind.is_native() {
                return Err(CfmapError::bean_mapping(format!(
                    "The component '{}' of multi-key class '{type_name}' should be of a natively serializable type",
                    component.name
                )));
            }
        }

        Ok(Self {
            component_serializers: components.iter().map(|c| Serializer::for_kind(&c.kind)).collect(),
            component_names: components.iter().map(|c| c.name.clone()).collect(),
            component_kinds: components.into_iter().map(|c| c.kind).collect(),
            type_name,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn component_names(&self) -> &[String] {
        &self.component_names
    }

    pub fn component_kinds(&self) -> &[ValueKind] {
        &self.component_kinds
    }

    pub fn component_serializers(&self) -> &[Serializer] {
        &self.component_serializers
    }

    pub fn len(&self) -> usize {
        self.component_serializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.component_serializers.is_empty()
    }
}

/// Join target, resolved after all entities of a session are parsed.
pub struct JoinProperties {
    cascade: BTreeSet<CascadeType>,
    target_class: String,
    target: OnceLock<Weak<EntityMeta>>,
}

impl JoinProperties {
    pub fn new(target_class: impl Into<String>, cascade: impl IntoIterator<Item = CascadeType>) -> Self {
        Self {
            cascade: cascade.into_iter().collect(),
            target_class: target_class.into(),
            target: OnceLock::new(),
        }
    }

    pub fn cascade(&self) -> &BTreeSet<CascadeType> {
        &self.cascade
    }

    pub fn cascades(&self, op: CascadeType) -> bool {
        self.cascade.contains(&CascadeType::All) || self.cascade.contains(&op)
    }

    /// Registry key of the join target.
    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    pub fn entity_meta(&self) -> Option<Arc<EntityMeta>> {
        self.target.get().and_then(Weak::upgrade)
    }

    /// Resolves the target. Returns `false` if it was already resolved.
    pub(crate) fn resolve(&self, meta: &Arc<EntityMeta>) -> bool {
        self.target.set(Arc::downgrade(meta)).is_ok()
    }
}

impl fmt::Debug for JoinProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinProperties")
            .field("cascade", &self.cascade)
            .field("target_class", &self.target_class)
            .field("resolved", &self.entity_meta().is_some())
            .finish()
    }
}

/// Counter storage of a property.
#[derive(Debug, Clone)]
pub struct CounterProperties {
    fqcn: String,
    dao: Arc<CounterDao>,
    id_meta: Arc<PropertyMeta>,
}

impl CounterProperties {
    pub fn new(fqcn: impl Into<String>, dao: Arc<CounterDao>, id_meta: Arc<PropertyMeta>) -> Self {
        Self {
            fqcn: fqcn.into(),
            dao,
            id_meta,
        }
    }

    pub fn fqcn(&self) -> &str {
        &self.fqcn
    }

    pub fn dao(&self) -> &Arc<CounterDao> {
        &self.dao
    }

    pub fn id_meta(&self) -> &Arc<PropertyMeta> {
        &self.id_meta
    }
}

/// Wide map stored in its own column family.
pub struct ExternalWideMapProperties {
    column_family_name: String,
    id_serializer: Serializer,
    dao: OnceLock<Arc<GenericCompositeDao>>,
}

impl ExternalWideMapProperties {
    pub fn new(column_family_name: impl Into<String>, id_serializer: Serializer) -> Self {
        Self {
            column_family_name: column_family_name.into(),
            id_serializer,
            dao: OnceLock::new(),
        }
    }

    pub fn with_dao(self, dao: Arc<GenericCompositeDao>) -> Self {
        let _ = self.dao.set(dao);
        self
    }

    pub fn column_family_name(&self) -> &str {
        &self.column_family_name
    }

    pub fn id_serializer(&self) -> Serializer {
        self.id_serializer
    }

    pub fn dao(&self) -> Option<&Arc<GenericCompositeDao>> {
        self.dao.get()
    }

    pub(crate) fn set_dao(&self, dao: Arc<GenericCompositeDao>) -> bool {
        self.dao.set(dao).is_ok()
    }
}

impl fmt::Debug for ExternalWideMapProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalWideMapProperties")
            .field("column_family_name", &self.column_family_name)
            .field("id_serializer", &self.id_serializer)
            .field("has_dao", &self.dao.get().is_some())
            .finish()
    }
}

/// Variant-specific blocks, one variant per [`PropertyType`].
#[derive(Debug)]
pub enum PropertyKind {
    Simple,
    LazySimple,
    List,
    LazyList,
    Set,
    LazySet,
    Map,
    LazyMap,
    WideMap {
        multi_key: Option<MultiKeyProperties>,
    },
    WideMapCounter {
        multi_key: Option<MultiKeyProperties>,
        counter: CounterProperties,
    },
    Counter(CounterProperties),
    JoinSimple(JoinProperties),
    JoinWideMap {
        multi_key: Option<MultiKeyProperties>,
        join: JoinProperties,
    },
    ExternalWideMap {
        multi_key: Option<MultiKeyProperties>,
        external: ExternalWideMapProperties,
    },
    ExternalJoinWideMap {
        multi_key: Option<MultiKeyProperties>,
        join: JoinProperties,
        external: ExternalWideMapProperties,
    },
}

impl PropertyKind {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyKind::Simple => PropertyType::Simple,
            PropertyKind::LazySimple => PropertyType::LazySimple,
            PropertyKind::List => PropertyType::List,
            PropertyKind::LazyList => PropertyType::LazyList,
            PropertyKind::Set => PropertyType::Set,
            PropertyKind::LazySet => PropertyType::LazySet,
            PropertyKind::Map => PropertyType::Map,
            PropertyKind::LazyMap => PropertyType::LazyMap,
            PropertyKind::WideMap { .. } => PropertyType::WideMap,
            PropertyKind::WideMapCounter { .. } => PropertyType::WideMapCounter,
            PropertyKind::Counter(_) => PropertyType::Counter,
            PropertyKind::JoinSimple(_) => PropertyType::JoinSimple,
            PropertyKind::JoinWideMap { .. } => PropertyType::JoinWideMap,
            PropertyKind::ExternalWideMap { .. } => PropertyType::ExternalWideMap,
            PropertyKind::ExternalJoinWideMap { .. } => PropertyType::ExternalJoinWideMap,
        }
    }

    fn multi_key(&self) -> Option<&MultiKeyProperties> {
        match self {
            PropertyKind::WideMap { multi_key }
            | PropertyKind::WideMapCounter { multi_key, .. }
            | PropertyKind::JoinWideMap { multi_key, .. }
            | PropertyKind::ExternalWideMap { multi_key, .. }
            | PropertyKind::ExternalJoinWideMap { multi_key, .. } => multi_key.as_ref(),
            _ => None,
        }
    }

    fn join(&self) -> Option<&JoinProperties> {
        match self {
            PropertyKind::JoinSimple(join)
            | PropertyKind::JoinWideMap { join, .. }
            | PropertyKind::ExternalJoinWideMap { join, .. } => Some(join),
            _ => None,
        }
    }

    fn counter(&self) -> Option<&CounterProperties> {
        match self {
            PropertyKind::Counter(counter) | PropertyKind::WideMapCounter { counter, .. } => Some(counter),
            _ => None,
        }
    }

    fn external(&self) -> Option<&ExternalWideMapProperties> {
        match self {
            PropertyKind::ExternalWideMap { external, .. }
            | PropertyKind::ExternalJoinWideMap { external, .. } => Some(external),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════
// PropertyMeta
// ════════════════════════════════════════════

/// Mapping metadata of one entity field.
pub struct PropertyMeta {
    name: String,
    entity_class: String,
    key_kind: Option<ValueKind>,
    value_kind: ValueKind,
    key_serializer: Option<Serializer>,
    value_serializer: Serializer,
    accessors: Option<Accessors>,
    consistency: Option<ConsistencyLevels>,
    kind: PropertyKind,
}

impl PropertyMeta {
    pub fn builder(name: impl Into<String>) -> PropertyMetaBuilder {
        PropertyMetaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class of the entity declaring this property.
    pub fn entity_class_name(&self) -> &str {
        &self.entity_class
    }

    pub fn property_type(&self) -> PropertyType {
        self.kind.property_type()
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn key_kind(&self) -> Option<&ValueKind> {
        self.key_kind.as_ref()
    }

    pub fn value_kind(&self) -> &ValueKind {
        &self.value_kind
    }

    /// Serializer of a single-component key; `None` for multi-keys and
    /// properties without a key.
    pub fn key_serializer(&self) -> Option<Serializer> {
        self.key_serializer
    }

    pub fn value_serializer(&self) -> Serializer {
        self.value_serializer
    }

    pub fn accessors(&self) -> Option<&Accessors> {
        self.accessors.as_ref()
    }

    /// Property-level consistency pair, if declared.
    pub fn consistency_levels(&self) -> Option<ConsistencyLevels> {
        self.consistency
    }

    pub fn is_lazy(&self) -> bool {
        self.property_type().is_lazy()
    }

    pub fn is_join(&self) -> bool {
        self.property_type().is_join_column()
    }

    pub fn is_wide_map(&self) -> bool {
        self.property_type().is_wide_map()
    }

    pub fn is_external(&self) -> bool {
        self.property_type().is_external()
    }

    pub fn is_counter(&self) -> bool {
        self.property_type().is_counter()
    }

    pub fn is_single_key(&self) -> bool {
        self.kind.multi_key().is_none()
    }

    pub fn multi_key_properties(&self) -> Option<&MultiKeyProperties> {
        self.kind.multi_key()
    }

    pub fn join_properties(&self) -> Option<&JoinProperties> {
        self.kind.join()
    }

    pub fn counter_properties(&self) -> Option<&CounterProperties> {
        self.kind.counter()
    }

    pub fn external_properties(&self) -> Option<&ExternalWideMapProperties> {
        self.kind.external()
    }

    /// Resolved join target; `None` when not a join property.
    pub fn join_meta(&self) -> Option<Arc<EntityMeta>> {
        self.kind.join().and_then(JoinProperties::entity_meta)
    }

    /// Resolved join target, or the mapping error of an unresolved one.
    pub fn require_join_meta(&self) -> CfmapResult<Arc<EntityMeta>> {
        self.join_meta().ok_or_else(|| {
            CfmapError::bean_mapping(format!(
                "Cannot find mapping for join entity '{}'",
                self.kind
                    .join()
                    .map_or(self.name.as_str(), JoinProperties::target_class)
            ))
        })
    }

    /// Id metadata of the join target; `None` when not a join property.
    pub fn join_id_meta(&self) -> Option<Arc<PropertyMeta>> {
        self.join_meta().map(|meta| Arc::clone(meta.id_meta()))
    }

    /// Id metadata of the owning entity; `None` when not a counter.
    pub fn counter_id_meta(&self) -> Option<&Arc<PropertyMeta>> {
        self.kind.counter().map(CounterProperties::id_meta)
    }

    pub fn counter_dao(&self) -> Option<&Arc<CounterDao>> {
        self.kind.counter().map(CounterProperties::dao)
    }

    pub fn external_column_family_name(&self) -> Option<&str> {
        self.kind.external().map(ExternalWideMapProperties::column_family_name)
    }

    pub fn external_dao(&self) -> Option<&Arc<GenericCompositeDao>> {
        self.kind.external().and_then(ExternalWideMapProperties::dao)
    }

    /// Reads this property from an entity instance.
    pub fn get_value(&self, entity: &dyn Any) -> CfmapResult<Option<Value>> {
        let accessors = self.accessors.as_ref().ok_or_else(|| self.no_accessor())?;
        (accessors.getter)(entity)
    }

    /// Writes this property on an entity instance.
    pub fn set_value(&self, entity: &mut dyn Any, value: Value) -> CfmapResult<()> {
        let accessors = self.accessors.as_ref().ok_or_else(|| self.no_accessor())?;
        (accessors.setter)(entity, value)
    }

    fn no_accessor(&self) -> CfmapError {
        CfmapError::Unsupported(format!(
            "The property '{}' of entity '{}' has no accessors",
            self.name, self.entity_class
        ))
    }

    /// Decodes a JSON or plain-string representation into the value kind.
    pub fn get_value_from_string(&self, raw: &str) -> CfmapResult<Value> {
        if self.value_kind == ValueKind::Text {
            return Ok(Value::Text(raw.to_string()));
        }
        let json: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| CfmapError::type_mismatch(self.value_kind.name(), e.to_string()))?;
        self.value_kind.from_json(json)
    }

    /// Decodes a key written by [`write_value_to_string`](Self::write_value_to_string).
    pub fn get_key_from_string(&self, raw: &str) -> CfmapResult<Value> {
        let kind = self.key_kind.as_ref().ok_or_else(|| {
            CfmapError::Unsupported(format!("The property '{}' has no key", self.name))
        })?;
        if *kind == ValueKind::Text {
            return Ok(Value::Text(raw.to_string()));
        }
        let json: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| CfmapError::type_mismatch(kind.name(), e.to_string()))?;
        kind.from_json(json)
    }

    /// Native values pass through unchanged; anything else becomes JSON text.
    pub fn write_value_as_supported_type_or_string<'a>(&self, value: &'a Value) -> Cow<'a, Value> {
        match value {
            Value::Object(_)
            | Value::Components(_)
            | Value::List(_)
            | Value::Set(_)
            | Value::Map(_) => Cow::Owned(Value::Text(value.to_json().to_string())),
            _ => Cow::Borrowed(value),
        }
    }

    /// String form stored in entity rows: text as-is, everything else as JSON.
    pub fn write_value_to_string(&self, value: &Value) -> String {
        match value {
            Value::Text(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Coerces a decoded value into the value kind, through JSON only for
    /// non-native kinds.
    pub fn cast_value(&self, raw: Value) -> CfmapResult<Value> {
        match &self.value_kind {
            // Join columns hold raw target ids.
            ValueKind::Entity(_) => Ok(raw),
            kind => kind.coerce(raw),
        }
    }

    pub fn new_list_instance(&self) -> Vec<Value> {
        Vec::new()
    }

    pub fn new_set_instance(&self) -> HashSet<Value> {
        HashSet::new()
    }

    pub fn new_map_instance(&self) -> HashMap<Value, Value> {
        HashMap::new()
    }
}

impl fmt::Debug for PropertyMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMeta")
            .field("name", &self.name)
            .field("entity_class", &self.entity_class)
            .field("type", &self.property_type())
            .field("key_kind", &self.key_kind)
            .field("value_kind", &self.value_kind)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

// ════════════════════════════════════════════
// Builder
// ════════════════════════════════════════════

/// Assembles a [`PropertyMeta`] and checks that the supplied blocks match
/// the property type.
#[derive(Default)]
pub struct PropertyMetaBuilder {
    name: String,
    entity_class: String,
    key_kind: Option<ValueKind>,
    value_kind: Option<ValueKind>,
    accessors: Option<Accessors>,
    consistency: Option<ConsistencyLevels>,
    multi_key: Option<MultiKeyProperties>,
    join: Option<JoinProperties>,
    counter: Option<CounterProperties>,
    external: Option<ExternalWideMapProperties>,
}

impl PropertyMetaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn entity_class(mut self, class_name: impl Into<String>) -> Self {
        self.entity_class = class_name.into();
        self
    }

    pub fn key_kind(mut self, kind: ValueKind) -> Self {
        self.key_kind = Some(kind);
        self
    }

    pub fn value_kind(mut self, kind: ValueKind) -> Self {
        self.value_kind = Some(kind);
        self
    }

    pub fn accessors(mut self, accessors: Option<Accessors>) -> Self {
        self.accessors = accessors;
        self
    }

    pub fn consistency(mut self, levels: Option<ConsistencyLevels>) -> Self {
        self.consistency = levels;
        self
    }

    pub fn multi_key(mut self, multi_key: Option<MultiKeyProperties>) -> Self {
        self.multi_key = multi_key;
        self
    }

    pub fn join(mut self, join: JoinProperties) -> Self {
        self.join = Some(join);
        self
    }

    pub fn counter(mut self, counter: CounterProperties) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn external(mut self, external: ExternalWideMapProperties) -> Self {
        self.external = Some(external);
        self
    }

    pub fn build(self, property_type: PropertyType) -> CfmapResult<PropertyMeta> {
        let PropertyMetaBuilder {
            name,
            entity_class,
            key_kind,
            value_kind,
            accessors,
            consistency,
            multi_key,
            join,
            counter,
            external,
        } = self;

        let value_kind = value_kind.ok_or_else(|| {
            CfmapError::bean_mapping(format!("The property '{name}' should declare a value type"))
        })?;

        let mismatch = |block: &str| {
            CfmapError::bean_mapping(format!(
                "The property '{name}' of type {property_type} cannot carry {block} properties"
            ))
        };
        if join.is_some() && !property_type.is_join_column() {
            return Err(mismatch("join"));
        }
        if counter.is_some() && !property_type.is_counter() {
            return Err(mismatch("counter"));
        }
        if external.is_some() && !property_type.is_external() {
            return Err(mismatch("external wide map"));
        }
        if multi_key.is_some() && !property_type.is_wide_map() {
            return Err(mismatch("multi-key"));
        }
        if property_type.is_wide_map() && key_kind.is_none() {
            return Err(CfmapError::bean_mapping(format!(
                "The wide map property '{name}' should declare a key type"
            )));
        }

        let missing = |block: &str| {
            CfmapError::bean_mapping(format!(
                "The property '{name}' of type {property_type} requires {block} properties"
            ))
        };
        let kind = match property_type {
            PropertyType::Simple => PropertyKind::Simple,
            PropertyType::LazySimple => PropertyKind::LazySimple,
            PropertyType::List => PropertyKind::List,
            PropertyType::LazyList => PropertyKind::LazyList,
            PropertyType::Set => PropertyKind::Set,
            PropertyType::LazySet => PropertyKind::LazySet,
            PropertyType::Map => PropertyKind::Map,
            PropertyType::LazyMap => PropertyKind::LazyMap,
            PropertyType::WideMap => PropertyKind::WideMap { multi_key },
            PropertyType::WideMapCounter => PropertyKind::WideMapCounter {
                multi_key,
                counter: counter.ok_or_else(|| missing("counter"))?,
            },
            PropertyType::Counter => PropertyKind::Counter(counter.ok_or_else(|| missing("counter"))?),
            PropertyType::JoinSimple => PropertyKind::JoinSimple(join.ok_or_else(|| missing("join"))?),
            PropertyType::JoinWideMap => PropertyKind::JoinWideMap {
                multi_key,
                join: join.ok_or_else(|| missing("join"))?,
            },
            PropertyType::ExternalWideMap => PropertyKind::ExternalWideMap {
                multi_key,
                external: external.ok_or_else(|| missing("external wide map"))?,
            },
            PropertyType::ExternalJoinWideMap => PropertyKind::ExternalJoinWideMap {
                multi_key,
                join: join.ok_or_else(|| missing("join"))?,
                external: external.ok_or_else(|| missing("external wide map"))?,
            },
        };

        let key_serializer = match (&key_kind, kind.multi_key()) {
            (Some(k), None) => Some(Serializer::for_kind(k)),
            _ => None,
        };

        Ok(PropertyMeta {
            value_serializer: Serializer::for_kind(&value_kind),
            key_serializer,
            name,
            entity_class,
            key_kind,
            value_kind,
            accessors,
            consistency,
            kind,
        })
    }
}
