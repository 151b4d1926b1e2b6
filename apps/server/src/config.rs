//! Server configuration.
//!
//! Layered, lowest precedence first:
//! 1. `config/default.toml` (embedded at compile time)
//! 2. the file named by `DSU_CONFIG`, if set
//! 3. environment variables prefixed `DSU__`, e.g. `DSU__SEARCH__DEFAULT_LIMIT=50`

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes
    pub max_request_body_size: usize,
    /// Allowed CORS origins; empty disables CORS headers
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
    pub statement_timeout_seconds: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON array of data points loaded into the memory store at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size when the caller does not pass `limit`
    pub default_limit: i64,
}

/// Names of the headers carrying the identity resolved by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub subject_header: String,
    pub grant_header: String,
    /// Grant type that marks a service (machine) credential
    pub service_grant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for the service crates (trace, debug, info, warn, error)
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
    pub service_name: String,
    pub deployment_environment: String,
}

impl Config {
    /// Load `.env`, the embedded defaults, the optional `DSU_CONFIG` file and
    /// `DSU__*` environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let path = std::env::var("DSU_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path)
    }

    pub fn load_from(path: Option<PathBuf>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            DEFAULTS,
            config::FileFormat::Toml,
        ));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("DSU")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    /// The embedded defaults only, ignoring files and the environment.
    pub fn defaults() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.search.default_limit < 0 {
            return Err(format!(
                "search.default_limit must be >= 0, got {}",
                self.search.default_limit
            ));
        }
        if self.database.pool_min_size > self.database.pool_max_size {
            return Err(format!(
                "database.pool_min_size ({}) exceeds database.pool_max_size ({})",
                self.database.pool_min_size, self.database.pool_max_size
            ));
        }
        if self.store.backend == StoreBackend::Postgres && self.database.url.trim().is_empty() {
            return Err("database.url is required for the postgres store".to_string());
        }
        if self.store.backend == StoreBackend::Postgres && self.store.seed_file.is_some() {
            return Err("store.seed_file is only supported by the memory store".to_string());
        }
        for (name, value) in [
            ("auth.subject_header", &self.auth.subject_header),
            ("auth.grant_header", &self.auth.grant_header),
        ] {
            axum::http::HeaderName::from_bytes(value.as_bytes())
                .map_err(|_| format!("{name} is not a valid header name: '{value}'"))?;
        }
        if !matches!(
            self.logging.file_rotation.as_str(),
            "daily" | "hourly" | "minutely" | "never"
        ) {
            return Err(format!(
                "logging.file_rotation must be daily, hourly, minutely or never, got '{}'",
                self.logging.file_rotation
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address '{addr}': {e}"))
    }
}
