//! Media asset records
//!
//! One row per stored image (poster/backdrop), recording the external
//! source path it came from. The source path is the dedupe metadata: an
//! ingestion that sees the same path keeps the existing asset instead of
//! re-downloading and re-optimizing the image.

use sqlx::SqlitePool;
use vril_common::Result;

pub const KIND_POSTER: &str = "poster";
pub const KIND_BACKDROP: &str = "backdrop";

/// Stored media asset record
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct MediaAsset {
    pub id: i64,
    pub movie_id: i64,
    pub kind: String,
    pub source_path: String,
    pub file_path: String,
    pub created_at: String,
}

/// Load all assets for a movie
pub async fn find_for_movie(pool: &SqlitePool, movie_id: i64) -> Result<Vec<MediaAsset>> {
    let assets = sqlx::query_as::<_, MediaAsset>(
        "SELECT id, movie_id, kind, source_path, file_path, created_at \
         FROM media_assets WHERE movie_id = ? ORDER BY kind",
    )
    .bind(movie_id)
    .fetch_all(pool)
    .await?;

    Ok(assets)
}

/// Load one asset by movie and kind
pub async fn find_asset(
    pool: &SqlitePool,
    movie_id: i64,
    kind: &str,
) -> Result<Option<MediaAsset>> {
    let asset = sqlx::query_as::<_, MediaAsset>(
        "SELECT id, movie_id, kind, source_path, file_path, created_at \
         FROM media_assets WHERE movie_id = ? AND kind = ?",
    )
    .bind(movie_id)
    .bind(kind)
    .fetch_optional(pool)
    .await?;

    Ok(asset)
}

/// Record an asset, replacing any previous one of the same kind
pub async fn upsert_asset(
    pool: &SqlitePool,
    movie_id: i64,
    kind: &str,
    source_path: &str,
    file_path: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO media_assets (movie_id, kind, source_path, file_path, created_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (movie_id, kind) DO UPDATE SET
            source_path = excluded.source_path,
            file_path = excluded.file_path,
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(movie_id)
    .bind(kind)
    .bind(source_path)
    .bind(file_path)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete all asset rows for a movie, returning them so the caller can
/// unlink the stored files
pub async fn delete_for_movie(pool: &SqlitePool, movie_id: i64) -> Result<Vec<MediaAsset>> {
    let assets = find_for_movie(pool, movie_id).await?;

    sqlx::query("DELETE FROM media_assets WHERE movie_id = ?")
        .bind(movie_id)
        .execute(pool)
        .await?;

    Ok(assets)
}
