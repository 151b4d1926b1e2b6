pub mod assertions;
pub mod fixtures;

use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    Router,
};
use dsu_server::{
    api::create_router, config::StoreBackend, db::MemoryDataPointStore, models::DataPoint,
    AppState, Config,
};
use serde_json::Value;
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

/// Identity the gateway would forward for a request.
#[derive(Debug, Clone, Copy)]
pub enum Identity<'a> {
    Anonymous,
    EndUser(&'a str),
    Service(&'a str),
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryDataPointStore>,
    pub config: Config,
}

impl TestApp {
    pub async fn new(data_points: Vec<DataPoint>) -> anyhow::Result<Self> {
        let mut config = Config::defaults().context("load default config")?;
        config.store.backend = StoreBackend::Memory;

        let store = Arc::new(MemoryDataPointStore::default());
        store
            .insert_all(data_points)
            .await
            .context("seed memory store")?;

        let state = AppState::with_store(config.clone(), Arc::clone(&store));
        let router = create_router(state);

        Ok(Self {
            router,
            store,
            config,
        })
    }

    pub async fn get(
        &self,
        path_and_query: &str,
        identity: Identity<'_>,
    ) -> anyhow::Result<(StatusCode, Bytes)> {
        let mut builder = Request::builder().method("GET").uri(path_and_query);
        match identity {
            Identity::Anonymous => {}
            Identity::EndUser(subject) => {
                builder = builder.header(self.config.auth.subject_header.as_str(), subject);
            }
            Identity::Service(subject) => {
                builder = builder
                    .header(self.config.auth.subject_header.as_str(), subject)
                    .header(
                        self.config.auth.grant_header.as_str(),
                        self.config.auth.service_grant.as_str(),
                    );
            }
        }
        let request = builder.body(Body::empty()).context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;
        Ok((status, body))
    }

    pub async fn get_json(
        &self,
        path_and_query: &str,
        identity: Identity<'_>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let (status, body) = self.get(path_and_query, identity).await?;
        let json = serde_json::from_slice(&body)
            .with_context(|| format!("parse JSON body: {}", String::from_utf8_lossy(&body)))?;
        Ok((status, json))
    }
}

/// Percent-encode a filter expression for a query string.
pub fn enc(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
