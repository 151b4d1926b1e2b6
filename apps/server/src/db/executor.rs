//! Query executor
//!
//! Validates predicate presence and pagination before any store call, builds
//! the query plan, and hands it to the store backend.

use std::collections::HashSet;
use std::sync::Arc;

use dsu_search::fields;

use super::traits::{DataPointStore, DataPointStream, Predicate};
use crate::{Error, Result};

/// Bounded find: filter, skip, limit.
#[derive(Debug, Clone)]
pub struct FindPlan<P> {
    pub predicate: P,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

/// Filter, unwind `group_field`, group by it, and collect `collect_field`
/// into a per-group set.
#[derive(Debug, Clone)]
pub struct DistinctPlan<P> {
    pub predicate: P,
    pub aggregation: AggregationSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    pub group_field: String,
    pub collect_field: String,
}

impl AggregationSpec {
    /// Distinct owners: group and collect on `header.user_id`.
    pub fn participants() -> Self {
        Self {
            group_field: fields::USER_ID.to_string(),
            collect_field: fields::USER_ID.to_string(),
        }
    }
}

pub struct QueryExecutor<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DataPointStore> QueryExecutor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Find matching data points.
    ///
    /// A missing predicate is an error: matching everything has to be asked
    /// for explicitly.
    pub fn find(
        &self,
        predicate: Option<Predicate<S>>,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<DataPointStream> {
        let predicate = require_predicate(predicate)?;
        let skip = non_negative("offset", offset)?;
        let limit = non_negative("limit", limit)?;

        tracing::debug!(?skip, ?limit, "Executing find plan");
        Ok(self.store.find(FindPlan {
            predicate,
            skip,
            limit,
        }))
    }

    /// Owners of at least one matching data point, each listed once.
    pub async fn find_distinct_participants(
        &self,
        predicate: Option<Predicate<S>>,
    ) -> Result<HashSet<String>> {
        let predicate = require_predicate(predicate)?;

        let participants = self
            .store
            .distinct(DistinctPlan {
                predicate,
                aggregation: AggregationSpec::participants(),
            })
            .await?;

        tracing::debug!(count = participants.len(), "Aggregated distinct participants");
        Ok(participants)
    }
}

fn require_predicate<P>(predicate: Option<P>) -> Result<P> {
    predicate.ok_or_else(|| Error::Argument("a search predicate is required".to_string()))
}

fn non_negative(name: &str, value: Option<i64>) -> Result<Option<u64>> {
    value
        .map(|v| {
            u64::try_from(v).map_err(|_| Error::Argument(format!("{name} must be >= 0, got {v}")))
        })
        .transpose()
}
