//! Error types for foamtail
//!
//! `AppError` is the crate-level error. Fetch and extraction failures keep
//! their own enums (`FetchError`, `ExtractError`) so callers can tell a
//! batch-fatal transport problem from a failure scoped to one metric.
//!
//! All errors implement `IntoResponse` for Axum handlers.

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid metric namespace '{namespace}': {reason}")]
    InvalidMetricKey { namespace: String, reason: String },

    /// Log fetch failed; fatal to the whole batch since every metric shares one fetch
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Extraction failed for a single metric
    #[error("Failed to extract {namespace}: {source}")]
    Extract {
        namespace: String,
        #[source]
        source: ExtractError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidMetricKey { .. } => StatusCode::BAD_REQUEST,
            Self::Fetch(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Fetch(FetchError::ClientBuild(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Extract {
                source: ExtractError::NotFound { .. },
                ..
            } => StatusCode::NOT_FOUND,
            Self::Extract { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
