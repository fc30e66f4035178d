//! Error types for anymusic-dl
//!
//! This module provides error handling for the library, including:
//! - The failure taxonomy of the extraction/transcode engine
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for anymusic-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for anymusic-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Submission rejected before a task was created
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Task (or file) not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// A registry update tried to move a task backwards along its lifecycle
    #[error("task {id}: invalid transition from {from} to {to}")]
    InvalidTransition {
        /// The task whose update was rejected
        id: TaskId,
        /// Status before the update
        from: TaskStatus,
        /// Status the update attempted to set
        to: TaskStatus,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failures raised by the extraction/transcode engine
///
/// Every variant is recorded into the failing task's `error` field. None of them is
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The URL could not be resolved to media (unavailable, private, deleted, unsupported)
    #[error("{0}")]
    Resolution(String),

    /// Network failure while downloading
    #[error("{0}")]
    Transfer(String),

    /// Post-processing (audio extraction/transcoding) failed
    #[error("{0}")]
    Transcode(String),

    /// Any other fault raised by the engine
    #[error("{0}")]
    Unknown(String),
}

impl EngineError {
    /// Machine-readable failure category
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Resolution(_) => FailureKind::ResolutionFailure,
            EngineError::Transfer(_) => FailureKind::TransferFailure,
            EngineError::Transcode(_) => FailureKind::TranscodeFailure,
            EngineError::Unknown(_) => FailureKind::UnknownFailure,
        }
    }

    /// Whether a playlist may skip the entry that raised this error
    pub fn is_skippable(&self) -> bool {
        matches!(self, EngineError::Resolution(_) | EngineError::Transfer(_))
    }
}

/// Category of a background task failure, serialized into task snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The engine could not resolve the URL to media
    ResolutionFailure,
    /// Network failure mid-download
    TransferFailure,
    /// The transcoding step failed
    TranscodeFailure,
    /// Any other fault from the engine
    UnknownFailure,
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "invalid input: url must not be empty"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::InvalidTransition { .. } => 409,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::InvalidTransition { id, from, to } => Some(serde_json::json!({
                "task_id": id,
                "from": from,
                "to": to,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
