//! Application state shared by every request handler

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dsu_search::FilterTranslator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::{
    config::{DatabaseConfig, StoreBackend},
    db::{DataPointStore, MemoryDataPointStore, PgDataPointStore},
    services::{DataPointSearch, SearchService},
    Config, Result,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: Arc<dyn DataPointSearch>,
}

impl AppState {
    /// Connect the configured store backend and build the search service.
    pub async fn new(config: Config) -> Result<Self> {
        match config.store.backend {
            StoreBackend::Postgres => {
                let pool = connect(&config.database).await?;
                if config.database.run_migrations {
                    tracing::info!("Running database migrations");
                    sqlx::migrate!("./migrations").run(&pool).await?;
                }
                Ok(Self::with_store(config, Arc::new(PgDataPointStore::new(pool))))
            }
            StoreBackend::Memory => {
                let store = MemoryDataPointStore::default();
                if let Some(path) = &config.store.seed_file {
                    let count = store.load_file(path).await?;
                    tracing::info!(count, path = %path.display(), "Seeded memory store");
                }
                tracing::warn!("Using the in-memory store; data is not persisted");
                Ok(Self::with_store(config, Arc::new(store)))
            }
        }
    }

    /// Build state over an already constructed store.
    pub fn with_store<S: DataPointStore>(config: Config, store: Arc<S>) -> Self {
        let translator = Arc::new(FilterTranslator::default());
        let search = SearchService::new(translator, store, config.search.default_limit);
        Self {
            config: Arc::new(config),
            search: Arc::new(search),
        }
    }
}

async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(&config.url)?.options([(
        "statement_timeout",
        format!("{}s", config.statement_timeout_seconds),
    )]);

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .connect_with(options)
        .await?;

    tracing::info!(
        min_connections = config.pool_min_size,
        max_connections = config.pool_max_size,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}
