//! Core trait for data point storage backends

use std::collections::HashSet;

use async_trait::async_trait;
use dsu_search::PredicateCompiler;
use futures::stream::BoxStream;

use super::executor::{DistinctPlan, FindPlan};
use crate::{models::DataPoint, Result};

/// Lazy, single-pass sequence of matching data points.
pub type DataPointStream = BoxStream<'static, Result<DataPoint>>;

/// Predicate type a store's compiler produces.
pub type Predicate<S> = <<S as DataPointStore>::Compiler as PredicateCompiler>::Predicate;

/// Storage backend for data point searches
///
/// A backend pairs a predicate compiler with the two query shapes the
/// executor issues. Plans arrive already validated.
#[async_trait]
pub trait DataPointStore: Send + Sync + Sized + 'static {
    type Compiler: PredicateCompiler;

    /// Compiler that renders condition trees for this store
    fn compiler(&self) -> &Self::Compiler;

    /// Run a find plan
    ///
    /// Matches are returned in store order; nothing is fetched until the
    /// stream is polled.
    fn find(&self, plan: FindPlan<Predicate<Self>>) -> DataPointStream;

    /// Run a filter → unwind → group aggregation
    ///
    /// Returns every distinct value of the grouped field among matching
    /// documents.
    async fn distinct(&self, plan: DistinctPlan<Predicate<Self>>) -> Result<HashSet<String>>;
}
