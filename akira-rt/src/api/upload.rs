//! Upload intake API handler
//!
//! POST /upload accepts a multipart MP4 video, stores it under the
//! session directory, and spawns the retune workflow in the background.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json, Router,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{RetuneParameters, RetuneSession, RetuneState};
use crate::services::intake::{self, SessionPaths};
use crate::AppState;

/// POST /upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub state: RetuneState,
    pub source_filename: String,
    /// True when an identical video was already retuned and its
    /// existing session is returned instead of running a new one
    pub deduplicated: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// POST /upload
///
/// Begin a retune session. Returns 202 Accepted with the session ID.
/// Expects a multipart form with a `video` file field and an optional
/// `parameters` JSON field.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    // A rejected upload must leave nothing on disk
    let mut created: Option<SessionPaths> = None;
    let result = ingest_upload(state, multipart, &mut created).await;

    if result.is_err() {
        if let Some(paths) = created {
            let _ = std::fs::remove_dir_all(paths.session_dir());
        }
    }

    result
}

/// Multipart intake body; `created` reports the session directory back
/// to the caller for cleanup on failure
async fn ingest_upload(
    state: AppState,
    mut multipart: Multipart,
    created: &mut Option<SessionPaths>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    // One pipeline at a time (409 Conflict)
    if crate::db::sessions::has_running_session(&state.db).await? {
        return Err(ApiError::Conflict(
            "A retune session is already running".to_string(),
        ));
    }

    let max_bytes =
        crate::config::resolve_max_upload_bytes(&state.db, &state.toml_config).await?;

    let mut session: Option<RetuneSession> = None;
    let mut paths: Option<SessionPaths> = None;
    let mut parameters: Option<RetuneParameters> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("parameters") => {
                let json = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable parameters: {}", e)))?;
                parameters = Some(serde_json::from_str(&json).map_err(|e| {
                    ApiError::BadRequest(format!("Invalid parameters JSON: {}", e))
                })?);
            }
            Some("video") => {
                let filename = intake::sanitize_filename(field.file_name().unwrap_or("upload.mp4"));

                let new_session = RetuneSession::new(
                    filename,
                    String::new(), // hash filled in after the upload is stored
                    RetuneParameters::default(),
                );
                let session_paths =
                    SessionPaths::create(&state.root_folder, new_session.session_id)?;
                *created = Some(session_paths.clone());

                store_upload_field(&mut field, &session_paths, max_bytes).await?;

                session = Some(new_session);
                paths = Some(session_paths);
            }
            _ => {
                // Unknown fields are ignored
            }
        }
    }

    let mut session = session
        .ok_or_else(|| ApiError::BadRequest("Missing `video` file field".to_string()))?;
    let paths = paths.expect("paths created with session");

    if let Some(parameters) = parameters {
        session.parameters = parameters;
    }

    // Content hash for deduplication
    session.source_hash = intake::hash_file(&paths.source_video()).await?;

    if let Some(existing) =
        crate::db::sessions::find_completed_by_hash(&state.db, &session.source_hash).await?
    {
        tracing::info!(
            session_id = %existing.session_id,
            hash = %session.source_hash,
            "Identical video already retuned; reusing completed session"
        );
        let _ = std::fs::remove_dir_all(paths.session_dir());

        return Ok((
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                session_id: existing.session_id,
                state: existing.state,
                source_filename: existing.source_filename,
                deduplicated: true,
                started_at: existing.started_at,
            }),
        ));
    }

    crate::db::sessions::save_session(&state.db, &session).await?;

    let response = UploadResponse {
        session_id: session.session_id,
        state: session.state,
        source_filename: session.source_filename.clone(),
        deduplicated: false,
        started_at: session.started_at,
    };

    tracing::info!(
        session_id = %session.session_id,
        source = %session.source_filename,
        "Retune session started and persisted to database"
    );

    // Register a cancellation token and spawn the workflow
    let cancel_token = tokio_util::sync::CancellationToken::new();
    state
        .cancellation_tokens
        .write()
        .await
        .insert(session.session_id, cancel_token.clone());

    let state_clone = state.clone();
    let session_id = session.session_id;
    tokio::spawn(async move {
        if let Err(e) = execute_retune_workflow(state_clone.clone(), session, cancel_token).await {
            tracing::error!(
                session_id = %session_id,
                error = %e,
                "Retune workflow background task failed"
            );
            *state_clone.last_error.write().await = Some(e.to_string());
        }
        state_clone
            .cancellation_tokens
            .write()
            .await
            .remove(&session_id);
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Stream the multipart video field to disk, sniffing and size-capping
async fn store_upload_field(
    field: &mut axum::extract::multipart::Field<'_>,
    paths: &SessionPaths,
    max_bytes: u64,
) -> ApiResult<()> {
    let mut file = tokio::fs::File::create(paths.source_video()).await?;
    let mut written: u64 = 0;
    let mut head: Vec<u8> = Vec::with_capacity(64);
    let mut validated = false;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Upload interrupted: {}", e)))?
    {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "Upload exceeds the {} byte limit",
                max_bytes
            )));
        }

        // Sniff the container type from the first bytes
        if !validated {
            head.extend_from_slice(&chunk[..chunk.len().min(64 - head.len())]);
            if head.len() >= 16 {
                intake::validate_mp4(&head).map_err(ApiError::Common)?;
                validated = true;
            }
        }

        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if !validated {
        // Too short to even hold an ftyp box
        intake::validate_mp4(&head).map_err(ApiError::Common)?;
    }
    if written == 0 {
        return Err(ApiError::BadRequest("Uploaded video is empty".to_string()));
    }

    Ok(())
}

/// Background task for workflow execution
///
/// Ensures the session ends in a terminal state even when error
/// handling itself fails.
async fn execute_retune_workflow(
    state: AppState,
    session: RetuneSession,
    cancel_token: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    use crate::services::{FfmpegClient, WorkflowOrchestrator};

    let session_id = session.session_id;
    tracing::info!(session_id = %session_id, "Starting retune workflow orchestration");

    let ffmpeg_path = crate::config::resolve_ffmpeg_path(&state.db, &state.toml_config).await?;
    let orchestrator = match FfmpegClient::new(&ffmpeg_path) {
        Ok(ffmpeg) => WorkflowOrchestrator::new(
            state.db.clone(),
            state.event_bus.clone(),
            state.root_folder.clone(),
            ffmpeg,
        ),
        Err(e) => {
            mark_session_failed(&state, session_id, &anyhow::anyhow!("{}", e)).await;
            return Err(e.into());
        }
    };

    match orchestrator.execute_retune(session, cancel_token).await {
        Ok(final_session) => {
            tracing::info!(
                session_id = %session_id,
                state = ?final_session.state,
                "Retune workflow finished"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Retune workflow failed");

            match crate::db::sessions::load_session(&state.db, session_id).await {
                Ok(Some(session)) => {
                    if let Err(failure_error) = orchestrator.handle_failure(session, &e).await {
                        tracing::error!(
                            session_id = %session_id,
                            error = %failure_error,
                            "Failed to mark session as failed - attempting direct database update"
                        );
                        mark_session_failed(&state, session_id, &e).await;
                    }
                }
                Ok(None) => {
                    tracing::error!(
                        session_id = %session_id,
                        "Session not found in database - cannot mark as failed"
                    );
                }
                Err(db_error) => {
                    tracing::error!(
                        session_id = %session_id,
                        error = %db_error,
                        "Failed to load session from database - attempting direct database update"
                    );
                    mark_session_failed(&state, session_id, &e).await;
                }
            }

            Err(e)
        }
    }
}

/// Last-resort direct database update to a FAILED terminal state
async fn mark_session_failed(state: &AppState, session_id: Uuid, error: &anyhow::Error) {
    let _ = sqlx::query(
        r#"UPDATE retune_sessions
           SET state = '"FAILED"',
               ended_at = ?,
               current_operation = ?
           WHERE session_id = ?"#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(format!("Retune failed: {}", error))
    .bind(session_id.to_string())
    .execute(&state.db)
    .await;
}

/// Build upload routes
///
/// GET serves the upload page so the form posts back to the same path.
pub fn upload_routes() -> Router<AppState> {
    use axum::routing::get;

    Router::new().route(
        "/upload",
        get(crate::api::ui::upload_page).post(upload_video),
    )
    // Uploads are size-capped in the handler against the configured limit
    .layer(axum::extract::DefaultBodyLimit::disable())
}
