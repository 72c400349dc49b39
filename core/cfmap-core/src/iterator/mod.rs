//! Lazy cursors and key/value projections over wide-map columns

mod factory;
mod key_value;
mod slice;

pub use factory::KeyValueFactory;
pub use key_value::{
    CounterKeyValueIterator, JoinKeyValueIterator, KeyValue, KeyValueCursor, KeyValueIterator, Remover,
};
pub use slice::SliceIterator;
