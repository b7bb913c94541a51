//! Error handling module
//!
//! Provides unified error types and handling for the entire application.
//!
//! Two kinds of 409 are *expected* in normal use and are not bug signals:
//! `TransitionDenied` (illegal state-machine move or policy blockers) and
//! `EngineBlocked` (runtime guard refused an effectful action).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Illegal state transition or unknown engine at the authority layer.
    /// Always recoverable by the caller choosing a legal target.
    #[error("Transition denied: {0}")]
    TransitionDenied(String),

    /// The runtime guard refused an effectful action. The caller must not
    /// retry the same action until engine state changes.
    #[error("Engine blocked: {engine}/{action} in state {state}: {reason}")]
    EngineBlocked {
        engine: String,
        action: String,
        state: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::TransitionDenied(msg) => (
                StatusCode::CONFLICT,
                "TRANSITION_DENIED",
                msg.clone(),
                None,
            ),
            AppError::EngineBlocked { engine, action, state, reason } => (
                StatusCode::CONFLICT,
                "ENGINE_BLOCKED",
                format!("Engine '{}' blocked for action '{}'", engine, action),
                Some(format!("state={} reason={}", state, reason)),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                None,
            ),
            AppError::Storage(msg) => {
                error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;
