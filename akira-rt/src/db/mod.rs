//! Database access for akira-rt
//!
//! Single SQLite database in the root folder holding settings, retune
//! sessions, and per-segment classification results.

pub mod segments;
pub mod sessions;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to akira.db in the root folder, creating it when absent.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize akira-rt tables
///
/// Creates settings, retune_sessions, and flagged_segments tables if
/// they don't exist.
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Settings table for parameter persistence
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Retune session persistence
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS retune_sessions (
            session_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            source_filename TEXT NOT NULL,
            source_hash TEXT NOT NULL,
            parameters TEXT NOT NULL,
            progress_current INTEGER NOT NULL DEFAULT 0,
            progress_total INTEGER NOT NULL DEFAULT 0,
            progress_percentage REAL NOT NULL DEFAULT 0.0,
            current_operation TEXT NOT NULL DEFAULT '',
            errors TEXT NOT NULL DEFAULT '[]',
            flagged_segments INTEGER NOT NULL DEFAULT 0,
            total_segments INTEGER NOT NULL DEFAULT 0,
            repetition_detected INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Per-segment classification results
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flagged_segments (
            session_id TEXT NOT NULL,
            segment_index INTEGER NOT NULL,
            start_seconds REAL NOT NULL,
            end_seconds REAL NOT NULL,
            coverage REAL NOT NULL,
            overstimulating INTEGER NOT NULL,
            retuned INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session_id, segment_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, retune_sessions, flagged_segments)");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    init_tables(&pool).await.expect("init tables");
    pool
}
