//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Submission, progress polling, task listing
//! - [`files`] - Serving produced audio files
//! - [`system`] - Health, capabilities, events, OpenAPI

use crate::types::TaskId;
use serde::{Deserialize, Serialize};

mod files;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Source URL (single item or playlist)
    #[serde(default)]
    pub url: String,
    /// Resolve the URL as a playlist (default: false)
    #[serde(default)]
    pub is_playlist: bool,
}

/// Response for POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    /// Identifier to poll with
    pub task_id: TaskId,
    /// Human-readable acknowledgement
    pub message: String,
}

/// Response for GET /api/progress/:task_id when the task is unknown
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct NotFoundResponse {
    /// Always "not_found"
    pub status: String,
}
