//! Store-specific rendering of condition trees.

mod document;
mod sql;

pub use document::{DocumentCompiler, DocumentPredicate};
pub use sql::{BindValue, SqlCompiler, SqlPredicate};

use crate::filter::ConditionNode;

/// Renders a [`ConditionNode`] tree into a store-native predicate.
///
/// Compilation cannot fail: every tree the translator produces has a
/// rendering in every store.
pub trait PredicateCompiler: Send + Sync {
    type Predicate: Send + Sync + 'static;

    fn compile(&self, node: &ConditionNode) -> Self::Predicate;
}
