//! Retune workflow API handlers
//!
//! GET /jobs/:id/status, POST /jobs/:id/cancel, GET /jobs/:id/report

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{RetuneSession, RetuneState, SegmentReport};
use crate::AppState;

/// GET /jobs/:id/status response
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub state: RetuneState,
    pub source_filename: String,
    pub progress: crate::models::RetuneProgress,
    pub errors: Vec<crate::models::RetuneSessionError>,
    pub flagged_segments: usize,
    pub total_segments: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// POST /jobs/:id/cancel response
#[derive(Debug, serde::Serialize)]
pub struct CancelResponse {
    pub session_id: Uuid,
    pub state: RetuneState,
    pub cancelled_at: chrono::DateTime<chrono::Utc>,
}

/// GET /jobs/:id/status
///
/// Poll retune progress.
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    let session = load_session_or_404(&state, session_id).await?;

    tracing::debug!(session_id = %session_id, state = ?session.state, "Status query");

    Ok(Json(StatusResponse {
        session_id: session.session_id,
        state: session.state,
        source_filename: session.source_filename,
        progress: session.progress,
        errors: session.errors,
        flagged_segments: session.flagged_segments,
        total_segments: session.total_segments,
        started_at: session.started_at,
        ended_at: session.ended_at,
    }))
}

/// POST /jobs/:id/cancel
///
/// Cancel a running retune. The background task observes the token
/// between phases and finishes the session in the CANCELLED state.
pub async fn cancel_retune(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let session = load_session_or_404(&state, session_id).await?;

    if session.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "Retune session already in terminal state: {:?}",
            session.state
        )));
    }

    match state.cancellation_tokens.read().await.get(&session_id) {
        Some(token) => token.cancel(),
        None => {
            // No live task (e.g. service restarted); mark directly
            tracing::warn!(
                session_id = %session_id,
                "No running task for session; cancelling in database"
            );
            let mut session = session;
            session.transition_to(RetuneState::Cancelled);
            crate::db::sessions::save_session(&state.db, &session).await?;
        }
    }

    tracing::info!(session_id = %session_id, "Retune session cancellation requested");

    Ok(Json(CancelResponse {
        session_id,
        state: RetuneState::Cancelled,
        cancelled_at: chrono::Utc::now(),
    }))
}

/// GET /jobs/:id/report
///
/// Flagged-segment report for a classified session.
pub async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SegmentReport>> {
    let session = load_session_or_404(&state, session_id).await?;
    let segments = crate::db::segments::load_segments(&state.db, session_id).await?;

    if segments.is_empty() && !session.is_terminal() {
        return Err(ApiError::NotFound(format!(
            "Session {} has not been classified yet",
            session_id
        )));
    }

    let duration_seconds = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);

    Ok(Json(SegmentReport::new(
        session.session_id,
        session.source_filename,
        duration_seconds,
        session.repetition_detected,
        segments,
    )))
}

pub(crate) async fn load_session_or_404(
    state: &AppState,
    session_id: Uuid,
) -> ApiResult<RetuneSession> {
    crate::db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Retune session not found: {}", session_id)))
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/:session_id/status", get(get_status))
        .route("/jobs/:session_id/cancel", post(cancel_retune))
        .route("/jobs/:session_id/report", get(get_report))
}
