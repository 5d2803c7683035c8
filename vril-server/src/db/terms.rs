//! Taxonomy term resolution
//!
//! Terms (genres, production companies, article tags) are uniquely keyed
//! by external TMDb ID when they have one, with a name-based fallback for
//! legacy terms created before external IDs were tracked. The fallback
//! backfills the external ID on first match.
//!
//! Resolution is one upsert on `UNIQUE (taxonomy, name)`, so concurrent
//! duplicate calls cannot create duplicate terms.

use sqlx::SqlitePool;
use vril_common::{Error, Result};

pub const TAX_GENRE: &str = "genre";
pub const TAX_COMPANY: &str = "company";
pub const TAX_ARTICLE_TAG: &str = "article-tag";

/// Stored taxonomy term
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Term {
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    pub tmdb_id: Option<i64>,
}

/// Term with its usage count (for tag listings)
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct TermUsage {
    pub id: i64,
    pub name: String,
    pub count: i64,
}

/// Find a term by its external TMDb ID
pub async fn find_by_external_id(
    pool: &SqlitePool,
    taxonomy: &str,
    tmdb_id: i64,
) -> Result<Option<Term>> {
    let term = sqlx::query_as::<_, Term>(
        "SELECT id, taxonomy, name, tmdb_id FROM terms WHERE taxonomy = ? AND tmdb_id = ?",
    )
    .bind(taxonomy)
    .bind(tmdb_id)
    .fetch_optional(pool)
    .await?;

    Ok(term)
}

/// Find a term by exact name
pub async fn find_by_name(pool: &SqlitePool, taxonomy: &str, name: &str) -> Result<Option<Term>> {
    let term = sqlx::query_as::<_, Term>(
        "SELECT id, taxonomy, name, tmdb_id FROM terms WHERE taxonomy = ? AND name = ?",
    )
    .bind(taxonomy)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(term)
}

/// Resolve a term to its ID, creating it when missing
///
/// Lookup order: external ID, then exact name (backfilling the external
/// ID onto legacy terms), then create. Steps two and three collapse into
/// a single upsert whose COALESCE keeps an already-recorded external ID,
/// making the whole sequence idempotent under concurrent duplicate calls.
pub async fn resolve_or_create(
    pool: &SqlitePool,
    taxonomy: &str,
    tmdb_id: Option<i64>,
    name: &str,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Cannot create unnamed {} term",
            taxonomy
        )));
    }

    if let Some(external_id) = tmdb_id {
        if let Some(term) = find_by_external_id(pool, taxonomy, external_id).await? {
            return Ok(term.id);
        }
    }

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO terms (taxonomy, name, tmdb_id) VALUES (?, ?, ?)
        ON CONFLICT (taxonomy, name) DO UPDATE SET
            tmdb_id = COALESCE(terms.tmdb_id, excluded.tmdb_id)
        RETURNING id
        "#,
    )
    .bind(taxonomy)
    .bind(name)
    .bind(tmdb_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Does a term with this ID exist under the given taxonomy?
pub async fn exists(pool: &SqlitePool, taxonomy: &str, id: i64) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM terms WHERE taxonomy = ? AND id = ?")
        .bind(taxonomy)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

/// List article tags with usage counts, alphabetical
pub async fn list_article_tags(pool: &SqlitePool) -> Result<Vec<TermUsage>> {
    let tags = sqlx::query_as::<_, TermUsage>(
        r#"
        SELECT t.id, t.name,
               (SELECT COUNT(*) FROM article_terms at WHERE at.term_id = t.id) AS count
        FROM terms t
        WHERE t.taxonomy = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(TAX_ARTICLE_TAG)
    .fetch_all(pool)
    .await?;

    Ok(tags)
}
