//! Storage layer - store backends and the query executor

pub mod executor;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use executor::{AggregationSpec, DistinctPlan, FindPlan, QueryExecutor};
pub use memory::MemoryDataPointStore;
pub use postgres::PgDataPointStore;
pub use traits::{DataPointStore, DataPointStream, Predicate};
