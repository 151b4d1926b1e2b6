//! Data point search core.
//!
//! Turns structured search parameters and caller-supplied filter fragments
//! into store-native predicates:
//! - [`criteria::SearchCriteria`] renders a canonical filter expression
//! - [`filter::FilterTranslator`] parses filter expressions into a
//!   [`filter::ConditionNode`] tree with literal coercion
//! - [`compile::PredicateCompiler`] implementations render the tree for a store

#![forbid(unsafe_code)]

pub mod compile;
pub mod criteria;
mod error;
pub mod filter;
pub mod interval;

pub use compile::{
    BindValue, DocumentCompiler, DocumentPredicate, PredicateCompiler, SqlCompiler, SqlPredicate,
};
pub use criteria::{SchemaVersion, SearchCriteria};
pub use error::{Error, Result};
pub use filter::{
    ComparisonOp, ConditionNode, FieldPath, FilterTranslator, Literal, LiteralCoercion,
};
pub use interval::{Bound, Interval};

/// Field paths in the data point header that the criteria and the
/// participant aggregation address.
pub mod fields {
    pub const USER_ID: &str = "header.user_id";
    pub const SCHEMA_NAMESPACE: &str = "header.schema_id.namespace";
    pub const SCHEMA_NAME: &str = "header.schema_id.name";
    pub const SCHEMA_VERSION_MAJOR: &str = "header.schema_id.version.major";
    pub const SCHEMA_VERSION_MINOR: &str = "header.schema_id.version.minor";
    pub const SCHEMA_VERSION_QUALIFIER: &str = "header.schema_id.version.qualifier";
    pub const CREATION_DATE_TIME: &str = "header.creation_date_time";
}
