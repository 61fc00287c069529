//! Settings database operations
//!
//! Get/set accessors for the settings table following the key-value
//! pattern. Database values override environment and TOML values.

use akira_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Get configured ffmpeg binary path
///
/// **Returns:** Some(path) if set, None to fall through to environment/TOML
pub async fn get_ffmpeg_path(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "ffmpeg_path").await
}

/// Set ffmpeg binary path
pub async fn set_ffmpeg_path(db: &Pool<Sqlite>, path: String) -> Result<()> {
    set_setting(db, "ffmpeg_path", path).await
}

/// Get maximum accepted upload size in bytes
///
/// **Default:** 536870912 (512 MiB)
pub async fn get_max_upload_bytes(db: &Pool<Sqlite>) -> Result<u64> {
    get_setting(db, "max_upload_bytes")
        .await
        .map(|opt| opt.unwrap_or(512 * 1024 * 1024))
}

/// Set maximum accepted upload size in bytes
pub async fn set_max_upload_bytes(db: &Pool<Sqlite>, bytes: u64) -> Result<()> {
    set_setting(db, "max_upload_bytes", bytes).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    // TC-SET-001: Given no stored value, When read, Then None / default
    #[tokio::test]
    async fn tc_set_001_missing_values() {
        let pool = test_pool().await;
        assert!(get_ffmpeg_path(&pool).await.unwrap().is_none());
        assert_eq!(get_max_upload_bytes(&pool).await.unwrap(), 512 * 1024 * 1024);
    }

    // TC-SET-002: Given a stored value, When read back, Then it matches
    #[tokio::test]
    async fn tc_set_002_set_get_round_trip() {
        let pool = test_pool().await;
        set_ffmpeg_path(&pool, "/opt/ffmpeg/bin/ffmpeg".to_string())
            .await
            .unwrap();
        assert_eq!(
            get_ffmpeg_path(&pool).await.unwrap().as_deref(),
            Some("/opt/ffmpeg/bin/ffmpeg")
        );

        set_max_upload_bytes(&pool, 1024).await.unwrap();
        assert_eq!(get_max_upload_bytes(&pool).await.unwrap(), 1024);
    }

    // TC-SET-003: Given a stored value, When set again, Then it is replaced
    #[tokio::test]
    async fn tc_set_003_overwrite() {
        let pool = test_pool().await;
        set_max_upload_bytes(&pool, 1).await.unwrap();
        set_max_upload_bytes(&pool, 2).await.unwrap();
        assert_eq!(get_max_upload_bytes(&pool).await.unwrap(), 2);
    }
}
