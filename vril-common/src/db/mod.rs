//! Database access for the tracker services
//!
//! One shared SQLite database holds entities, taxonomy terms, media asset
//! records, settings, cached query results, and auth tokens.

pub mod schema;
pub mod settings;

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// runs schema initialization.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    schema::initialize_schema(&pool).await?;

    Ok(pool)
}

/// Connect to an in-memory database with full schema (tests)
///
/// Capped at one connection: every pooled connection to `:memory:` gets
/// its own database, so a larger pool would see empty tables.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    schema::initialize_schema(&pool).await?;

    Ok(pool)
}
