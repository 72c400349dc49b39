//! Entity and property mapping metadata

mod entity_meta;
mod property_meta;
mod property_type;

pub use entity_meta::{EntityDao, EntityMeta, EntityMetaBuilder};
pub use property_meta::{
    Accessors, CascadeType, CounterProperties, ExternalWideMapProperties, Getter, JoinProperties,
    MultiKeyProperties, PropertyKind, PropertyMeta, PropertyMetaBuilder, Setter,
};
pub use property_type::PropertyType;
