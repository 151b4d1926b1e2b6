//! Data point search service
//!
//! Builds and validates search criteria, scopes every search to an owner
//! according to the caller's credential, and drives the filter translator,
//! the store's predicate compiler, and the query executor.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dsu_search::{
    criteria::quote, fields, interval::Timestamp, ConditionNode, FilterTranslator,
    PredicateCompiler, SearchCriteria,
};
use serde::Deserialize;

use crate::{
    auth::Caller,
    db::{DataPointStore, DataPointStream, QueryExecutor},
    Result,
};

/// Structured search parameters, before the owner is resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub schema_namespace: String,
    pub schema_name: String,
    pub schema_version: Option<String>,
    pub created_on_or_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,
    pub acquisition_source_id: Option<String>,
    /// Owner a service caller searches on behalf of
    pub target_user_id: Option<String>,
}

/// Requested window; unset fields fall back to offset 0 and the configured
/// default limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl Page {
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        Self { offset, limit }
    }
}

/// Search operations exposed to the HTTP layer.
#[async_trait]
pub trait DataPointSearch: Send + Sync {
    /// Structured search, optionally narrowed by a raw filter.
    async fn search_data_points(
        &self,
        caller: &Caller,
        request: SearchRequest,
        raw_filter: Option<&str>,
        page: Page,
    ) -> Result<DataPointStream>;

    /// Raw filter search.
    async fn search_data_points_by_filter(
        &self,
        caller: &Caller,
        raw_filter: &str,
        target_user_id: Option<&str>,
        page: Page,
    ) -> Result<DataPointStream>;

    /// Distinct owners of the data points matching a raw filter.
    async fn find_participants(
        &self,
        caller: &Caller,
        raw_filter: &str,
        target_user_id: Option<&str>,
    ) -> Result<HashSet<String>>;
}

pub struct SearchService<S> {
    translator: Arc<FilterTranslator>,
    executor: QueryExecutor<S>,
    default_limit: i64,
}

impl<S: DataPointStore> SearchService<S> {
    pub fn new(translator: Arc<FilterTranslator>, store: Arc<S>, default_limit: i64) -> Self {
        Self {
            translator,
            executor: QueryExecutor::new(store),
            default_limit,
        }
    }

    fn find(&self, node: &ConditionNode, page: Page) -> Result<DataPointStream> {
        let predicate = self.executor.store().compiler().compile(node);
        self.executor.find(
            Some(predicate),
            Some(page.offset.unwrap_or(0)),
            Some(page.limit.unwrap_or(self.default_limit)),
        )
    }

    fn owner_clause(&self, owner: &str) -> Result<ConditionNode> {
        let clause = format!("{} == {}", fields::USER_ID, quote(owner));
        Ok(self.translator.translate(&clause)?)
    }

    /// Translate `raw` on its own and conjoin it with `scope`.
    ///
    /// The two sides are combined as trees, so nothing in the raw fragment
    /// can reach outside its own conjunct.
    fn scoped(&self, scope: Option<ConditionNode>, raw: &str) -> Result<ConditionNode> {
        let raw = self.translator.translate(raw)?;
        Ok(match scope {
            Some(scope) => ConditionNode::And(vec![scope, raw]),
            None => raw,
        })
    }

    fn owner_scoped(&self, owner: Option<&str>, raw: &str) -> Result<ConditionNode> {
        let scope = owner.map(|owner| self.owner_clause(owner)).transpose()?;
        self.scoped(scope, raw)
    }
}

/// Owner a search is restricted to, if any.
///
/// End users always search their own data. Service callers search the
/// named target, or everything when none is given.
fn resolve_owner(caller: &Caller, target_user_id: Option<&str>) -> Option<String> {
    let target = target_user_id.map(str::trim).filter(|t| !t.is_empty());
    if caller.may_impersonate() {
        return target.map(str::to_string);
    }
    if let Some(target) = target.filter(|t| *t != caller.subject) {
        tracing::warn!(
            subject = %caller.subject,
            target = %target,
            "Ignoring end user id supplied by a non-service caller"
        );
    }
    Some(caller.subject.clone())
}

#[async_trait]
impl<S: DataPointStore> DataPointSearch for SearchService<S> {
    async fn search_data_points(
        &self,
        caller: &Caller,
        request: SearchRequest,
        raw_filter: Option<&str>,
        page: Page,
    ) -> Result<DataPointStream> {
        let owner = resolve_owner(caller, request.target_user_id.as_deref())
            .unwrap_or_else(|| caller.subject.clone());

        let mut criteria = SearchCriteria::new(owner, request.schema_namespace, request.schema_name)
            .with_schema_version(request.schema_version)
            .with_creation_range(request.created_on_or_after, request.created_before);
        criteria.acquisition_source_id = request.acquisition_source_id;
        criteria.check()?;

        let rendered = criteria.render()?;
        let scope = self.translator.translate(&rendered)?;
        let node = match raw_filter.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => self.scoped(Some(scope), raw)?,
            None => scope,
        };

        tracing::debug!(criteria = %rendered, query = ?raw_filter, "Searching data points by criteria");
        self.find(&node, page)
    }

    async fn search_data_points_by_filter(
        &self,
        caller: &Caller,
        raw_filter: &str,
        target_user_id: Option<&str>,
        page: Page,
    ) -> Result<DataPointStream> {
        let owner = resolve_owner(caller, target_user_id);
        let node = self.owner_scoped(owner.as_deref(), raw_filter)?;

        tracing::debug!(owner = ?owner, filter = %raw_filter, "Searching data points by filter");
        self.find(&node, page)
    }

    async fn find_participants(
        &self,
        caller: &Caller,
        raw_filter: &str,
        target_user_id: Option<&str>,
    ) -> Result<HashSet<String>> {
        let owner = resolve_owner(caller, target_user_id);
        let node = self.owner_scoped(owner.as_deref(), raw_filter)?;

        tracing::debug!(owner = ?owner, filter = %raw_filter, "Searching participants");
        let predicate = self.executor.store().compiler().compile(&node);
        self.executor.find_distinct_participants(Some(predicate)).await
    }
}
