//! Retuned output download handlers
//!
//! GET /jobs/:id/output streams the retuned video, GET /jobs/:id/source
//! streams the original upload for side-by-side comparison.

use axum::{
    body::Body,
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::path::Path;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::api::retune_workflow::load_session_or_404;
use crate::error::{ApiError, ApiResult};
use crate::models::RetuneState;
use crate::services::intake::SessionPaths;
use crate::AppState;

/// GET /jobs/:id/output
///
/// Stream the retuned video. 404 until the session is COMPLETED.
pub async fn download_output(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<Uuid>,
) -> ApiResult<Response> {
    let session = load_session_or_404(&state, session_id).await?;

    if session.state != RetuneState::Completed {
        return Err(ApiError::NotFound(format!(
            "Session {} has no retuned output yet (state: {:?})",
            session_id, session.state
        )));
    }

    let paths = SessionPaths::locate(&state.root_folder, session_id);
    let filename = format!("retuned-{}", session.source_filename);
    stream_video(&paths.output_video(), &filename).await
}

/// GET /jobs/:id/source
///
/// Stream the original upload.
pub async fn download_source(
    State(state): State<AppState>,
    AxumPath(session_id): AxumPath<Uuid>,
) -> ApiResult<Response> {
    let session = load_session_or_404(&state, session_id).await?;

    let paths = SessionPaths::locate(&state.root_folder, session_id);
    stream_video(&paths.source_video(), &session.source_filename).await
}

/// Stream a video file with attachment disposition
async fn stream_video(path: &Path, filename: &str) -> ApiResult<Response> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("Video file missing: {}", path.display()))
        } else {
            ApiError::Io(e)
        }
    })?;

    let len = file.metadata().await.map(|m| m.len()).ok();
    let stream = ReaderStream::new(file);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    if let Some(len) = len {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// Build output download routes
pub fn output_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:session_id/output", get(download_output))
        .route("/jobs/:session_id/source", get(download_source))
}
