//! Settings store
//!
//! Flat string key/value table used for the TMDb API key, the global
//! watermark, and the seeded auth credentials.

use crate::Result;
use sqlx::SqlitePool;

/// Load a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(value,)| value))
}

/// Store a setting value, replacing any previous one
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a setting
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let pool = init_memory_pool().await.expect("pool");

        assert_eq!(get_setting(&pool, "tmdb_api_key").await.unwrap(), None);

        set_setting(&pool, "tmdb_api_key", "abc123").await.unwrap();
        assert_eq!(
            get_setting(&pool, "tmdb_api_key").await.unwrap().as_deref(),
            Some("abc123")
        );

        // overwrite
        set_setting(&pool, "tmdb_api_key", "def456").await.unwrap();
        assert_eq!(
            get_setting(&pool, "tmdb_api_key").await.unwrap().as_deref(),
            Some("def456")
        );

        delete_setting(&pool, "tmdb_api_key").await.unwrap();
        assert_eq!(get_setting(&pool, "tmdb_api_key").await.unwrap(), None);
    }
}
