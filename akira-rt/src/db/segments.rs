//! Flagged segment database operations

use akira_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::FlaggedSegment;

/// Replace all stored segments for a session
///
/// Classification runs once per session; a re-run overwrites the
/// previous verdicts inside a transaction.
pub async fn replace_segments(
    pool: &SqlitePool,
    session_id: Uuid,
    segments: &[FlaggedSegment],
) -> Result<()> {
    let session_id = session_id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM flagged_segments WHERE session_id = ?")
        .bind(&session_id)
        .execute(&mut *tx)
        .await?;

    for segment in segments {
        sqlx::query(
            r#"
            INSERT INTO flagged_segments (
                session_id, segment_index, start_seconds, end_seconds,
                coverage, overstimulating, retuned
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session_id)
        .bind(segment.segment_index as i64)
        .bind(segment.start_seconds as f64)
        .bind(segment.end_seconds as f64)
        .bind(segment.coverage as f64)
        .bind(segment.overstimulating as i64)
        .bind(segment.retuned as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load all segments for a session, ordered by index
pub async fn load_segments(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<FlaggedSegment>> {
    let rows = sqlx::query(
        r#"
        SELECT segment_index, start_seconds, end_seconds,
               coverage, overstimulating, retuned
        FROM flagged_segments
        WHERE session_id = ?
        ORDER BY segment_index
        "#,
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| FlaggedSegment {
            segment_index: row.get::<i64, _>("segment_index") as usize,
            start_seconds: row.get::<f64, _>("start_seconds") as f32,
            end_seconds: row.get::<f64, _>("end_seconds") as f32,
            coverage: row.get::<f64, _>("coverage") as f32,
            overstimulating: row.get::<i64, _>("overstimulating") != 0,
            retuned: row.get::<i64, _>("retuned") != 0,
        })
        .collect())
}

/// Mark all overstimulating segments of a session as retuned
pub async fn mark_segments_retuned(pool: &SqlitePool, session_id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE flagged_segments SET retuned = 1 WHERE session_id = ? AND overstimulating = 1",
    )
    .bind(session_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
