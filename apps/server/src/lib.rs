//! Data point search server
//!
//! HTTP service over a store of Open mHealth data points:
//! - Structured search by schema, version and creation time
//! - Raw filter search in an RSQL/FIQL-style language
//! - Distinct participant lookup
//!
//! Every search is scoped to an owner derived from the caller's identity.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
