//! Configuration resolution for akira-rt
//!
//! Multi-tier configuration resolution with Database → ENV → TOML
//! priority. Unlike the root folder (resolved once at startup), the
//! ffmpeg path and upload limit are re-resolved per use so settings
//! changes apply without a restart.

use akira_common::config::TomlConfig;
use akira_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Resolve ffmpeg binary path from 3-tier configuration
///
/// **Priority:** Database → ENV (AKIRA_FFMPEG_PATH) → TOML → PATH lookup
///
/// Falls back to bare `ffmpeg` so an unconfigured install works when
/// the binary is on PATH.
pub async fn resolve_ffmpeg_path(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    let db_path = crate::db::settings::get_ffmpeg_path(db).await?;
    if db_path.as_deref().is_some_and(is_valid_path) {
        sources.push("database");
    }

    let env_path = std::env::var("AKIRA_FFMPEG_PATH").ok();
    if env_path.as_deref().is_some_and(is_valid_path) {
        sources.push("environment");
    }

    let toml_path = toml_config.ffmpeg_path.as_ref();
    if toml_path.map(|p| is_valid_path(p)).unwrap_or(false) {
        sources.push("TOML");
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "ffmpeg path found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(path) = db_path.filter(|p| is_valid_path(p)) {
        info!("ffmpeg path loaded from database: {}", path);
        return Ok(path);
    }

    if let Some(path) = env_path.filter(|p| is_valid_path(p)) {
        info!("ffmpeg path loaded from environment variable: {}", path);
        return Ok(path);
    }

    if let Some(path) = toml_path.filter(|p| is_valid_path(p)) {
        info!("ffmpeg path loaded from TOML config: {}", path);
        return Ok(path.clone());
    }

    Ok("ffmpeg".to_string())
}

/// Resolve maximum upload size in bytes
///
/// **Priority:** Database → TOML → 512 MiB default
pub async fn resolve_max_upload_bytes(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<u64> {
    if let Some((value,)) =
        sqlx::query_as::<_, (String,)>("SELECT value FROM settings WHERE key = 'max_upload_bytes'")
            .fetch_optional(db)
            .await?
    {
        if let Ok(bytes) = value.parse::<u64>() {
            return Ok(bytes);
        }
        warn!("Ignoring unparseable max_upload_bytes setting: {}", value);
    }

    if let Some(bytes) = toml_config.max_upload_bytes {
        return Ok(bytes);
    }

    Ok(512 * 1024 * 1024)
}

/// Validate a configured path (non-empty, non-whitespace)
pub fn is_valid_path(path: &str) -> bool {
    !path.trim().is_empty()
}
