//! Custom Axum extractors.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::Error;

/// Query string extractor that deserializes and validates its target.
///
/// Malformed or missing parameters are argument errors; values that parse
/// but break a declared constraint are validation errors. Both render as
/// the service's JSON error body instead of axum's plain-text rejection.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::Argument(rejection.body_text()))?;
        value
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;
        Ok(Self(value))
    }
}
