//! Backend Error Types
//!
//! This module defines error types specific to the backend server.
//! These errors are used in HTTP handlers and can be converted to HTTP
//! responses.
//!
//! # Status Code Mapping
//!
//! - Duplicate analysis submission -> 409 Conflict
//! - Full pipeline queue / shut-down pipeline -> 503 Service Unavailable
//! - Missing records and unknown groups -> 404 Not Found
//! - Non-member publish -> 403 Forbidden
//! - Validation failures -> 400 Bad Request
//! - Storage and serialization faults -> 500 Internal Server Error

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::backend::analysis::pipeline::PipelineError;
use crate::backend::realtime::broadcast::BroadcastError;
use crate::backend::store::StoreError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// This enum represents all possible errors that can occur in the
/// backend request path. Each variant carries enough context to build
/// an HTTP response.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g. missing headers, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Analysis pipeline rejection
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Group broadcast rejection
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// Shared error (validation, serialization)
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Pipeline(err) => match err {
                PipelineError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
                PipelineError::QueueFull | PipelineError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Store(err) => match err {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Broadcast(err) => match err {
                BroadcastError::UnknownGroup { .. } => StatusCode::NOT_FOUND,
                BroadcastError::NotAMember { .. } => StatusCode::FORBIDDEN,
                BroadcastError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Shared(err) => match err {
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[Server] request failed: {self}");
        }
        (status, axum::Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}
