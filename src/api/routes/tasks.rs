//! Task handlers: submission, progress polling, listing.

use super::{NotFoundResponse, SubmitRequest, SubmitResponse};
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::TaskId;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /api/download - Submit a URL for conversion
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "tasks",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Task accepted", body = SubmitResponse),
        (status = 400, description = "Invalid URL", body = ApiError),
        (status = 503, description = "Server is shutting down", body = ApiError)
    )
)]
pub async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::validation(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state
        .converter
        .submit(&request.url, request.is_playlist)
        .await
    {
        Ok(task_id) => (
            StatusCode::OK,
            Json(SubmitResponse {
                task_id,
                message: "Download started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/progress/:task_id - Poll a task
#[utoipa::path(
    get,
    path = "/api/progress/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID returned by POST /api/download")
    ),
    responses(
        (status = 200, description = "Current task state", body = crate::types::TaskState),
        (status = 404, description = "Unknown task", body = NotFoundResponse)
    )
)]
pub async fn get_progress(State(state): State<AppState>, Path(task_id): Path<String>) -> Response {
    let task = match task_id.parse::<TaskId>() {
        Ok(id) => state.converter.poll(id).await,
        Err(_) => None,
    };

    match task {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(NotFoundResponse {
                status: "not_found".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /api/tasks - List all tasks, newest first
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All known tasks", body = Vec<crate::types::TaskState>)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.converter.list_tasks().await))
}
