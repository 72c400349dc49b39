//! Column family schema derivation and validation

mod creator;
mod definition;
mod helper;

pub use creator::ColumnFamilyCreator;
pub use definition::{
    ColumnFamilyDefinition, ComparatorType, DefaultValidator, MAX_CF_NAME_LENGTH, normalize_and_validate_cf_name,
};
pub use helper::ColumnFamilyHelper;
