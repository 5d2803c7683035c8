//! Query result cache
//!
//! Maps a normalized query-parameter signature to a previously computed
//! result set. Entries are keyed by a SHA-256 digest of the canonical
//! parameter serialization and carry the global watermark value from
//! write time: a stored entry whose watermark no longer matches the
//! current one is treated as a miss even though the row still exists
//! (lazy invalidation; no sweep is required for correctness).
//!
//! Rows expire after one week as storage hygiene; expired rows are swept
//! opportunistically on writes.

use crate::{watermark, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

const KEY_PREFIX: &str = "vril";
const EXPIRATION_SECS: i64 = 7 * 24 * 60 * 60; // one week

/// Build the cache key for an action + normalized params
///
/// Params are serialized sorted by name with canonical string values, so
/// two requests that normalize identically share a key regardless of the
/// order their query string spelled them in.
pub fn cache_key(action: &str, params: &BTreeMap<String, String>) -> String {
    let canonical = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();

    format!("{}_{}__{:x}", KEY_PREFIX, action, digest)
}

/// Look up a cached result set
///
/// Returns `None` when the entry is absent, expired, or was written under
/// a different watermark than the current one.
pub async fn get(
    pool: &SqlitePool,
    action: &str,
    params: &BTreeMap<String, String>,
) -> Result<Option<serde_json::Value>> {
    let key = cache_key(action, params);

    let row: Option<(String, i64, i64)> =
        sqlx::query_as("SELECT value, watermark, expires_at FROM transients WHERE cache_key = ?")
            .bind(&key)
            .fetch_optional(pool)
            .await?;

    let Some((value, stored_watermark, expires_at)) = row else {
        return Ok(None);
    };

    let now = chrono::Utc::now().timestamp();
    if expires_at <= now {
        tracing::debug!(key = %key, "Cache entry expired");
        return Ok(None);
    }

    if stored_watermark != watermark::current(pool).await? {
        tracing::debug!(key = %key, "Cache entry stale (watermark mismatch)");
        return Ok(None);
    }

    match serde_json::from_str(&value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
            Ok(None)
        }
    }
}

/// Store a computed result set under the current watermark
pub async fn put(
    pool: &SqlitePool,
    action: &str,
    params: &BTreeMap<String, String>,
    value: &serde_json::Value,
) -> Result<()> {
    let key = cache_key(action, params);
    let now = chrono::Utc::now().timestamp();
    let stored_watermark = watermark::current(pool).await?;

    sqlx::query(
        r#"
        INSERT INTO transients (cache_key, value, watermark, expires_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (cache_key) DO UPDATE SET
            value = excluded.value,
            watermark = excluded.watermark,
            expires_at = excluded.expires_at
        "#,
    )
    .bind(&key)
    .bind(value.to_string())
    .bind(stored_watermark)
    .bind(now + EXPIRATION_SECS)
    .execute(pool)
    .await?;

    sweep_expired(pool, now).await?;

    Ok(())
}

/// Invalidate every cached entry in O(1) by bumping the watermark
pub async fn invalidate_all(pool: &SqlitePool) -> Result<()> {
    watermark::bump(pool).await?;

    Ok(())
}

/// Delete physically expired rows (storage hygiene, not correctness)
async fn sweep_expired(pool: &SqlitePool, now: i64) -> Result<()> {
    let swept = sqlx::query("DELETE FROM transients WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();

    if swept > 0 {
        tracing::debug!(swept, "Swept expired cache entries");
    }

    Ok(())
}
