use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::{round_store::RoundError, storage::StorageError},
    services::recovery_service::RecoveryError,
    state::{game::UnknownPhase, phases::DependencyError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Server wiring is broken.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<UnknownPhase> for ServiceError {
    fn from(err: UnknownPhase) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<DependencyError> for ServiceError {
    fn from(err: DependencyError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<RoundError> for ServiceError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::GameNotFound(id) => ServiceError::NotFound(format!("game {id}")),
            RoundError::Storage(source) => ServiceError::Unavailable(source),
            other => ServiceError::InvalidState(other.to_string()),
        }
    }
}

impl From<RecoveryError> for ServiceError {
    fn from(err: RecoveryError) -> Self {
        match err {
            RecoveryError::AlreadyInProgress => {
                ServiceError::InvalidState("recovery already in progress".into())
            }
            RecoveryError::ListActiveGames(source) | RecoveryError::Lock(source) => {
                ServiceError::Unavailable(source)
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
