//! Composite column names: encoding, key factories and column decoding

mod component;
mod factory;
pub mod transformer;

pub use component::{Component, ComponentEquality, Composite, DynamicComposite};
pub use factory::{BoundingMode, CompositeKeyFactory, DynamicCompositeKeyFactory, WideMapOrdering};
