//! Batched writes against one store

use super::{Column, ColumnName, Mutation, MutationOp};

/// Accumulates mutations until they are executed as one batch.
#[derive(Debug, Default, Clone)]
pub struct Mutator {
    mutations: Vec<Mutation>,
}

impl Mutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_insertion(&mut self, column_family: &str, row_key: Vec<u8>, column: Column) -> &mut Self {
        self.push(column_family, row_key, MutationOp::Insert(column))
    }

    /// Deletes one column, or the whole row when `name` is `None`.
    pub fn add_deletion(&mut self, column_family: &str, row_key: Vec<u8>, name: Option<ColumnName>) -> &mut Self {
        self.push(column_family, row_key, MutationOp::Delete(name))
    }

    pub fn add_counter(
        &mut self,
        column_family: &str,
        row_key: Vec<u8>,
        name: ColumnName,
        delta: i64,
    ) -> &mut Self {
        self.push(column_family, row_key, MutationOp::CounterAdd { name, delta })
    }

    pub fn add_counter_deletion(
        &mut self,
        column_family: &str,
        row_key: Vec<u8>,
        name: Option<ColumnName>,
    ) -> &mut Self {
        self.push(column_family, row_key, MutationOp::CounterDelete(name))
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    fn push(&mut self, column_family: &str, row_key: Vec<u8>, op: MutationOp) -> &mut Self {
        self.mutations.push(Mutation {
            column_family: column_family.to_string(),
            row_key,
            op,
        });
        self
    }
}
