//! Serving produced audio files.

use crate::api::AppState;
use crate::utils::{content_disposition, resolve_download_path};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /downloads/*filename - Download a produced file as an attachment
#[utoipa::path(
    get,
    path = "/downloads/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name relative to the download directory, as listed in a task's `files`")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Path escapes the download directory", body = crate::error::ApiError),
        (status = 404, description = "File not found", body = crate::error::ApiError)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let path = match resolve_download_path(state.config.download_dir(), &filename) {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => return crate::error::Error::Io(e).into_response(),
    };
    let length = file.metadata().await.ok().map(|m| m.len());

    tracing::debug!(file = %filename, "Serving file");

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(&filename).to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response();

    if let Some(length) = length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, length.into());
    }
    response
}

fn content_type(filename: &str) -> &'static str {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("aac") => "audio/mp4",
        Some("opus") | Some("ogg") | Some("vorbis") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}
