use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::engine::EngineError;
use crate::store::gateway::GatewayError;
use crate::store::models::TaskStatus;

/// The HTTP-facing error taxonomy (spec §7). Every handler returns this
/// rather than propagating `GatewayError`/`EngineError` directly, so the
/// status-code mapping lives in exactly one place.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: Option<TaskStatus>,
        to: TaskStatus,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let detail = self.to_string();
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::TaskNotFound(id) => Self::NotFound(format!("task {id} not found")),
            GatewayError::FoundJobNotFound(id) => {
                Self::NotFound(format!("found_job {id} not found"))
            }
            GatewayError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            GatewayError::Database(error) => Self::Internal(error.into()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Validation(message) => Self::Validation(message),
            EngineError::Gateway(error) => error.into(),
        }
    }
}
