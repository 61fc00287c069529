//! Retune session database operations

use akira_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RetuneParameters, RetuneProgress, RetuneSession, RetuneSessionError, RetuneState,
};

/// Save retune session to database (insert or update)
pub async fn save_session(pool: &SqlitePool, session: &RetuneSession) -> Result<()> {
    let session_id = session.session_id.to_string();
    let state = serde_json::to_string(&session.state)
        .map_err(|e| Error::Internal(format!("Failed to serialize state: {}", e)))?;
    let parameters = serde_json::to_string(&session.parameters)
        .map_err(|e| Error::Internal(format!("Failed to serialize parameters: {}", e)))?;
    let errors = serde_json::to_string(&session.errors)
        .map_err(|e| Error::Internal(format!("Failed to serialize errors: {}", e)))?;
    let started_at = session.started_at.to_rfc3339();
    let ended_at = session.ended_at.map(|dt| dt.to_rfc3339());

    sqlx::query(
        r#"
        INSERT INTO retune_sessions (
            session_id, state, source_filename, source_hash, parameters,
            progress_current, progress_total, progress_percentage,
            current_operation, errors, flagged_segments, total_segments,
            repetition_detected, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            state = excluded.state,
            progress_current = excluded.progress_current,
            progress_total = excluded.progress_total,
            progress_percentage = excluded.progress_percentage,
            current_operation = excluded.current_operation,
            errors = excluded.errors,
            flagged_segments = excluded.flagged_segments,
            total_segments = excluded.total_segments,
            repetition_detected = excluded.repetition_detected,
            ended_at = excluded.ended_at
        "#,
    )
    .bind(&session_id)
    .bind(&state)
    .bind(&session.source_filename)
    .bind(&session.source_hash)
    .bind(&parameters)
    .bind(session.progress.current as i64)
    .bind(session.progress.total as i64)
    .bind(session.progress.percentage)
    .bind(&session.progress.current_operation)
    .bind(&errors)
    .bind(session.flagged_segments as i64)
    .bind(session.total_segments as i64)
    .bind(session.repetition_detected as i64)
    .bind(&started_at)
    .bind(&ended_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load retune session from database
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<RetuneSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, state, source_filename, source_hash, parameters,
               progress_current, progress_total, progress_percentage,
               current_operation, errors, flagged_segments, total_segments,
               repetition_detected, started_at, ended_at
        FROM retune_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| session_from_row(&row)).transpose()
}

/// Check if any retune session is currently running
pub async fn has_running_session(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM retune_sessions
        WHERE state NOT IN ('"COMPLETED"', '"CANCELLED"', '"FAILED"')
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Find a completed session for the same source content
///
/// Upload deduplication: an identical video that was already retuned is
/// served from its existing session instead of re-running the pipeline.
pub async fn find_completed_by_hash(
    pool: &SqlitePool,
    source_hash: &str,
) -> Result<Option<RetuneSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, state, source_filename, source_hash, parameters,
               progress_current, progress_total, progress_percentage,
               current_operation, errors, flagged_segments, total_segments,
               repetition_detected, started_at, ended_at
        FROM retune_sessions
        WHERE source_hash = ? AND state = '"COMPLETED"'
        ORDER BY started_at DESC
        LIMIT 1
        "#,
    )
    .bind(source_hash)
    .fetch_optional(pool)
    .await?;

    row.map(|row| session_from_row(&row)).transpose()
}

/// Cleanup stale retune sessions on startup
///
/// Any session not in a terminal state when akira-rt starts is from a
/// previous run and will never complete. Mark these as CANCELLED.
pub async fn cleanup_stale_sessions(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE retune_sessions
        SET state = '"CANCELLED"',
            ended_at = ?,
            current_operation = 'Retune cancelled - akira-rt was restarted'
        WHERE state NOT IN ('"COMPLETED"', '"CANCELLED"', '"FAILED"')
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RetuneSession> {
    let session_id_str: String = row.get("session_id");
    let session_id = Uuid::parse_str(&session_id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse session_id: {}", e)))?;

    let state: String = row.get("state");
    let state: RetuneState = serde_json::from_str(&state)
        .map_err(|e| Error::Internal(format!("Failed to deserialize state: {}", e)))?;

    let parameters: String = row.get("parameters");
    let parameters: RetuneParameters = serde_json::from_str(&parameters)
        .map_err(|e| Error::Internal(format!("Failed to deserialize parameters: {}", e)))?;

    let errors: String = row.get("errors");
    let errors: Vec<RetuneSessionError> = serde_json::from_str(&errors)
        .map_err(|e| Error::Internal(format!("Failed to deserialize errors: {}", e)))?;

    let started_at: String = row.get("started_at");
    let started_at = chrono::DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| Error::Internal(format!("Failed to parse started_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let ended_at: Option<String> = row.get("ended_at");
    let ended_at = ended_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse ended_at: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    let progress = RetuneProgress {
        current: row.get::<i64, _>("progress_current") as usize,
        total: row.get::<i64, _>("progress_total") as usize,
        percentage: row.get("progress_percentage"),
        current_operation: row.get("current_operation"),
        elapsed_seconds: if let Some(end) = ended_at {
            (end - started_at).num_seconds() as u64
        } else {
            (chrono::Utc::now() - started_at).num_seconds() as u64
        },
        estimated_remaining_seconds: None, // Recalculated on demand
    };

    Ok(RetuneSession {
        session_id,
        state,
        source_filename: row.get("source_filename"),
        source_hash: row.get("source_hash"),
        parameters,
        progress,
        errors,
        flagged_segments: row.get::<i64, _>("flagged_segments") as usize,
        total_segments: row.get::<i64, _>("total_segments") as usize,
        repetition_detected: row.get::<i64, _>("repetition_detected") != 0,
        started_at,
        ended_at,
    })
}
