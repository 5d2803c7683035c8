//! Schema initialization
//!
//! `CREATE TABLE IF NOT EXISTS` for every table the tracker owns. The
//! UNIQUE constraints on `movies.tmdb_id`, `articles.url`, and
//! `terms(taxonomy, name)` are load-bearing: together with upsert
//! statements they make the find-or-create paths atomic under concurrent
//! requests.

use crate::Result;
use sqlx::SqlitePool;

/// Create all tables and indexes if they don't exist
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
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

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmdb_id INTEGER NOT NULL UNIQUE,
            title TEXT NOT NULL,
            compare_title TEXT NOT NULL,
            synopsis TEXT NOT NULL DEFAULT '',
            tagline TEXT NOT NULL DEFAULT '',
            release_date TEXT,
            runtime_minutes INTEGER NOT NULL DEFAULT 0,
            rating TEXT NOT NULL DEFAULT '',
            budget INTEGER NOT NULL DEFAULT 0,
            box_office INTEGER NOT NULL DEFAULT 0,
            website TEXT NOT NULL DEFAULT '',
            director TEXT NOT NULL DEFAULT '',
            writer TEXT NOT NULL DEFAULT '',
            to_watch INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            read INTEGER NOT NULL DEFAULT 0,
            favorite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taxonomy TEXT NOT NULL,
            name TEXT NOT NULL,
            tmdb_id INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (taxonomy, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movie_terms (
            movie_id INTEGER NOT NULL,
            term_id INTEGER NOT NULL,
            PRIMARY KEY (movie_id, term_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS article_terms (
            article_id INTEGER NOT NULL,
            term_id INTEGER NOT NULL,
            PRIMARY KEY (article_id, term_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            movie_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            source_path TEXT NOT NULL,
            file_path TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (movie_id, kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transients (
            cache_key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            watermark INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_movies_compare_title ON movies (compare_title)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_terms_external ON terms (taxonomy, tmdb_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database schema initialized");

    Ok(())
}
