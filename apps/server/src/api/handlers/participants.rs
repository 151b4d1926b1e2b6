//! GET /v1.0.M2/dataPointsByParticipant

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{api::extractors::ValidatedQuery, auth::Caller, state::AppState, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct ParticipantParams {
    #[validate(length(min = 1, message = "filter must not be empty"))]
    pub filter: String,
    pub end_user_id: Option<String>,
}

/// Distinct owners of the matching data points, sorted for stable output.
pub async fn find_participants(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedQuery(params): ValidatedQuery<ParticipantParams>,
) -> Result<Json<Vec<String>>> {
    let participants = state
        .search
        .find_participants(&caller, &params.filter, params.end_user_id.as_deref())
        .await?;

    let mut participants: Vec<String> = participants.into_iter().collect();
    participants.sort();
    Ok(Json(participants))
}
