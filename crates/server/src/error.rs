use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::oracle::OracleError;
use chess_core::{ResolveError, SessionError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<OracleError> for AppError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::IllegalMove(_) => AppError::Unprocessable(e.to_string()),
            OracleError::InvalidFen { .. } | OracleError::NothingToUndo => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Busy | SessionError::GameOver | SessionError::NotYourTurn(_) => {
                AppError::Conflict(e.to_string())
            }
            SessionError::Oracle(inner) => inner.into(),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::MalformedNotation { .. } | ResolveError::IllegalMove { .. } => {
                AppError::Unprocessable(e.to_string())
            }
            ResolveError::CollaboratorUnavailable(_) => AppError::ServiceUnavailable(e.to_string()),
            ResolveError::OracleInvariantViolation(_) => AppError::Internal(e.to_string()),
            ResolveError::Session(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Collaborator unavailable: {msg}");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}
