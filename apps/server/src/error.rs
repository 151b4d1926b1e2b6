//! Error types for the search service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid filter: {0}")]
    Parse(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<dsu_search::Error> for Error {
    fn from(err: dsu_search::Error) -> Self {
        match err {
            dsu_search::Error::Validation(msg) => Error::Validation(msg),
            e @ dsu_search::Error::Parse { .. } => Error::Parse(e.to_string()),
            dsu_search::Error::Argument(msg) => Error::Argument(msg),
        }
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Parse(_) | Error::Argument(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Database(_)
            | Error::Migration(_)
            | Error::Serialization(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "invalid-criteria",
            Error::Parse(_) => "invalid-filter",
            Error::Argument(_) => "invalid-argument",
            Error::Unauthorized(_) => "unauthorized",
            _ => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
