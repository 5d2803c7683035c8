//! Global last-updated watermark
//!
//! A single monotonically increasing integer bumped on every entity or
//! term mutation. Cached query results record the watermark they were
//! computed under; a mismatch at read time invalidates them lazily, so
//! invalidation stays O(1) no matter how many cache entries exist.
//!
//! The bump is one upsert statement computing `MAX(now, current + 1)`,
//! which keeps it atomic under concurrent writers and strictly
//! increasing even for several bumps within the same second.

use crate::Result;
use sqlx::SqlitePool;

const WATERMARK_KEY: &str = "last_updated";

/// Read the current watermark (0 when nothing has ever been written)
pub async fn current(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(WATERMARK_KEY)
        .fetch_optional(pool)
        .await?;

    Ok(row
        .and_then(|(value,)| value.parse::<i64>().ok())
        .unwrap_or(0))
}

/// Bump the watermark
///
/// Single-statement compare-and-bump: concurrent callers serialize on the
/// row and each observes a strictly larger value.
pub async fn bump(pool: &SqlitePool) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?1, CAST(?2 AS TEXT))
        ON CONFLICT (key) DO UPDATE SET
            value = CAST(MAX(?2, CAST(value AS INTEGER) + 1) AS TEXT)
        "#,
    )
    .bind(WATERMARK_KEY)
    .bind(now)
    .execute(pool)
    .await?;

    current(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[tokio::test]
    async fn starts_at_zero() {
        let pool = init_memory_pool().await.expect("pool");
        assert_eq!(current(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bump_is_strictly_increasing_within_one_second() {
        let pool = init_memory_pool().await.expect("pool");

        let first = bump(&pool).await.unwrap();
        let second = bump(&pool).await.unwrap();
        let third = bump(&pool).await.unwrap();

        assert!(second > first, "{} !> {}", second, first);
        assert!(third > second, "{} !> {}", third, second);
    }

    #[tokio::test]
    async fn bump_tracks_wall_clock() {
        let pool = init_memory_pool().await.expect("pool");

        let value = bump(&pool).await.unwrap();
        let now = chrono::Utc::now().timestamp();

        assert!((value - now).abs() <= 1);
    }
}
