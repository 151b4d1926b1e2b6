//! Caller identity.
//!
//! Token validation happens upstream: the gateway forwards the resolved
//! subject and the OAuth2 grant type in headers (names configured under
//! `[auth]`). The service only decides which owner a search is scoped to.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, state::AppState, Error};

/// Kind of credential the caller authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// An end user acting for themselves
    EndUser,
    /// A machine client that may search on behalf of a named user
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub subject: String,
    pub credential: CredentialKind,
}

impl Caller {
    pub fn end_user(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            credential: CredentialKind::EndUser,
        }
    }

    pub fn service(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            credential: CredentialKind::Service,
        }
    }

    pub fn may_impersonate(&self) -> bool {
        self.credential == CredentialKind::Service
    }

    pub fn from_headers(headers: &HeaderMap, config: &AuthConfig) -> Result<Self, Error> {
        let subject = header_str(headers, &config.subject_header)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::Unauthorized(format!("missing '{}' header", config.subject_header))
            })?;

        let credential = match header_str(headers, &config.grant_header) {
            Some(grant) if grant.eq_ignore_ascii_case(&config.service_grant) => {
                CredentialKind::Service
            }
            _ => CredentialKind::EndUser,
        };

        Ok(Self {
            subject: subject.to_string(),
            credential,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_headers(&parts.headers, &state.config.auth)?;
        tracing::debug!(
            subject = %caller.subject,
            credential = ?caller.credential,
            "Resolved caller"
        );
        Ok(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use axum::http::HeaderValue;

    fn auth() -> AuthConfig {
        Config::defaults().unwrap().auth
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn subject_without_grant_is_an_end_user() {
        let caller =
            Caller::from_headers(&headers(&[("x-authenticated-user", "u1")]), &auth()).unwrap();
        assert_eq!(caller, Caller::end_user("u1"));
        assert!(!caller.may_impersonate());
    }

    #[test]
    fn client_credentials_grant_is_a_service() {
        let caller = Caller::from_headers(
            &headers(&[
                ("x-authenticated-user", "reporting-job"),
                ("x-authenticated-grant", "client_credentials"),
            ]),
            &auth(),
        )
        .unwrap();
        assert_eq!(caller, Caller::service("reporting-job"));
        assert!(caller.may_impersonate());
    }

    #[test]
    fn other_grants_stay_end_users() {
        let caller = Caller::from_headers(
            &headers(&[
                ("x-authenticated-user", "u1"),
                ("x-authenticated-grant", "authorization_code"),
            ]),
            &auth(),
        )
        .unwrap();
        assert_eq!(caller.credential, CredentialKind::EndUser);
    }

    #[test]
    fn missing_or_blank_subject_is_unauthorized() {
        assert!(matches!(
            Caller::from_headers(&HeaderMap::new(), &auth()),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            Caller::from_headers(&headers(&[("x-authenticated-user", "  ")]), &auth()),
            Err(Error::Unauthorized(_))
        ));
    }
}
