//! Data point search handlers
//!
//! - GET /v1.0.M1/dataPoints: structured search, optionally narrowed by `query`
//! - GET /v1.0.M2/dataPoints: raw filter search

use axum::{extract::State, Json};
use dsu_search::interval::Timestamp;
use futures::TryStreamExt;
use serde::Deserialize;
use validator::Validate;

use crate::{
    api::extractors::ValidatedQuery,
    auth::Caller,
    models::DataPoint,
    services::{Page, SearchRequest},
    state::AppState,
    Result,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CriteriaSearchParams {
    #[validate(length(min = 1, message = "schema_namespace must not be empty"))]
    pub schema_namespace: String,
    #[validate(length(min = 1, message = "schema_name must not be empty"))]
    pub schema_name: String,
    pub schema_version: Option<String>,
    pub created_on_or_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,
    pub acquisition_source_id: Option<String>,
    pub query: Option<String>,
    pub end_user_id: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FilterSearchParams {
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,
    pub end_user_id: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn search_data_points(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedQuery(params): ValidatedQuery<CriteriaSearchParams>,
) -> Result<Json<Vec<DataPoint>>> {
    let request = SearchRequest {
        schema_namespace: params.schema_namespace,
        schema_name: params.schema_name,
        schema_version: params.schema_version,
        created_on_or_after: params.created_on_or_after,
        created_before: params.created_before,
        acquisition_source_id: params.acquisition_source_id,
        target_user_id: params.end_user_id,
    };

    let data_points: Vec<DataPoint> = state
        .search
        .search_data_points(
            &caller,
            request,
            params.query.as_deref(),
            Page::new(params.skip, params.limit),
        )
        .await?
        .try_collect()
        .await?;

    tracing::debug!(count = data_points.len(), "Criteria search complete");
    Ok(Json(data_points))
}

pub async fn search_data_points_by_filter(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedQuery(params): ValidatedQuery<FilterSearchParams>,
) -> Result<Json<Vec<DataPoint>>> {
    let data_points: Vec<DataPoint> = state
        .search
        .search_data_points_by_filter(
            &caller,
            &params.query,
            params.end_user_id.as_deref(),
            Page::new(params.skip, params.limit),
        )
        .await?
        .try_collect()
        .await?;

    tracing::debug!(count = data_points.len(), "Filter search complete");
    Ok(Json(data_points))
}
