//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use skyguard_core::error::{ArtifactError, GeometryError};
use skyguard_core::gate::CheckFailure;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Gone(String),
    /// Gate rejection; the itemized failure list travels in the body.
    #[error("gate evaluation did not pass")]
    GateFailed(Vec<CheckFailure>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<GeometryError> for ApiError {
    fn from(err: GeometryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Expired { .. } => Self::Gone(err.to_string()),
            ArtifactError::AlreadyUsed | ArtifactError::NotValid { .. } => {
                Self::Conflict(err.to_string())
            }
            ArtifactError::GateNotPassed { failures } => Self::GateFailed(failures),
            ArtifactError::BadSignature => Self::Validation(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg })),
            Self::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            Self::Gone(msg) => (StatusCode::GONE, json!({ "error": msg })),
            Self::GateFailed(failures) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "gate evaluation did not pass",
                    "failures": failures,
                }),
            ),
            Self::Internal(err) => {
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
