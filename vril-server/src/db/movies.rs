//! Movie persistence
//!
//! Movies are uniquely keyed by their TMDb ID; the upsert on that key is
//! what makes repeated ingestion of the same external ID land on one row.
//! The comparison title is recomputed on every write and drives the
//! listing sort order.

use crate::text;
use sqlx::SqlitePool;
use std::collections::HashSet;
use vril_common::Result;

/// Stored movie record
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub compare_title: String,
    pub synopsis: String,
    pub tagline: String,
    pub release_date: Option<String>,
    pub runtime_minutes: i64,
    pub rating: String,
    pub budget: i64,
    pub box_office: i64,
    pub website: String,
    pub director: String,
    pub writer: String,
    pub to_watch: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Field set written by the ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct MovieFields {
    pub tmdb_id: i64,
    pub title: String,
    pub synopsis: String,
    pub tagline: String,
    pub release_date: Option<String>,
    pub runtime_minutes: i64,
    pub rating: String,
    pub budget: i64,
    pub box_office: i64,
    pub website: String,
    pub director: String,
    pub writer: String,
    pub to_watch: bool,
}

/// Listing filters (all optional, combined with AND)
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub genre: Option<i64>,
    pub keyword: Option<String>,
    pub to_watch: Option<bool>,
    pub page: i64,
    pub count: i64,
}

const MOVIE_COLUMNS: &str = "id, tmdb_id, title, compare_title, synopsis, tagline, release_date, \
     runtime_minutes, rating, budget, box_office, website, director, writer, to_watch, \
     created_at, updated_at";

/// Insert or update a movie by TMDb ID, returning the row ID
///
/// All ingested fields overwrite on conflict; `created_at` survives.
pub async fn upsert_movie(pool: &SqlitePool, fields: &MovieFields) -> Result<i64> {
    let compare_title = text::compare_title(&fields.title);

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO movies (
            tmdb_id, title, compare_title, synopsis, tagline, release_date,
            runtime_minutes, rating, budget, box_office, website, director, writer,
            to_watch, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT (tmdb_id) DO UPDATE SET
            title = excluded.title,
            compare_title = excluded.compare_title,
            synopsis = excluded.synopsis,
            tagline = excluded.tagline,
            release_date = excluded.release_date,
            runtime_minutes = excluded.runtime_minutes,
            rating = excluded.rating,
            budget = excluded.budget,
            box_office = excluded.box_office,
            website = excluded.website,
            director = excluded.director,
            writer = excluded.writer,
            to_watch = excluded.to_watch,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(fields.tmdb_id)
    .bind(&fields.title)
    .bind(&compare_title)
    .bind(&fields.synopsis)
    .bind(&fields.tagline)
    .bind(&fields.release_date)
    .bind(fields.runtime_minutes)
    .bind(&fields.rating)
    .bind(fields.budget)
    .bind(fields.box_office)
    .bind(&fields.website)
    .bind(&fields.director)
    .bind(&fields.writer)
    .bind(fields.to_watch)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Load a movie by row ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Movie>> {
    let movie = sqlx::query_as::<_, Movie>(&format!(
        "SELECT {} FROM movies WHERE id = ?",
        MOVIE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(movie)
}

/// Load a movie by TMDb ID (the dedupe lookup)
pub async fn find_by_tmdb_id(pool: &SqlitePool, tmdb_id: i64) -> Result<Option<Movie>> {
    let movie = sqlx::query_as::<_, Movie>(&format!(
        "SELECT {} FROM movies WHERE tmdb_id = ?",
        MOVIE_COLUMNS
    ))
    .bind(tmdb_id)
    .fetch_optional(pool)
    .await?;

    Ok(movie)
}

/// Query movies with filters and pagination
///
/// Returns the page of movies (ordered by comparison title) and the total
/// match count across all pages.
pub async fn query_movies(pool: &SqlitePool, filter: &MovieFilter) -> Result<(Vec<Movie>, i64)> {
    let count = filter.count.max(1);
    let offset = (filter.page.max(1) - 1) * count;
    let keyword = filter
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());

    const WHERE_CLAUSE: &str = r#"
        (?1 IS NULL OR id IN (SELECT movie_id FROM movie_terms WHERE term_id = ?1))
        AND (?2 IS NULL OR title LIKE '%' || ?2 || '%' OR synopsis LIKE '%' || ?2 || '%')
        AND (?3 IS NULL OR to_watch = ?3)
    "#;

    let movies = sqlx::query_as::<_, Movie>(&format!(
        "SELECT {} FROM movies WHERE {} ORDER BY compare_title ASC LIMIT ?4 OFFSET ?5",
        MOVIE_COLUMNS, WHERE_CLAUSE
    ))
    .bind(filter.genre)
    .bind(keyword)
    .bind(filter.to_watch)
    .bind(count)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM movies WHERE {}",
        WHERE_CLAUSE
    ))
    .bind(filter.genre)
    .bind(keyword)
    .bind(filter.to_watch)
    .fetch_one(pool)
    .await?;

    Ok((movies, total))
}

/// Update the watch-list flag
pub async fn set_watch_flag(pool: &SqlitePool, id: i64, to_watch: bool) -> Result<bool> {
    let affected = sqlx::query(
        "UPDATE movies SET to_watch = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(to_watch)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Delete a movie and its taxonomy edges
pub async fn delete_movie(pool: &SqlitePool, id: i64) -> Result<bool> {
    sqlx::query("DELETE FROM movie_terms WHERE movie_id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let affected = sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Replace a movie's term assignments
pub async fn set_movie_terms(pool: &SqlitePool, movie_id: i64, term_ids: &[i64]) -> Result<()> {
    sqlx::query("DELETE FROM movie_terms WHERE movie_id = ?")
        .bind(movie_id)
        .execute(pool)
        .await?;

    for term_id in term_ids {
        sqlx::query(
            r#"
            INSERT INTO movie_terms (movie_id, term_id) VALUES (?, ?)
            ON CONFLICT (movie_id, term_id) DO NOTHING
            "#,
        )
        .bind(movie_id)
        .bind(term_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Names of a movie's terms under one taxonomy, alphabetical
pub async fn movie_term_names(
    pool: &SqlitePool,
    movie_id: i64,
    taxonomy: &str,
) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT t.name FROM terms t
        JOIN movie_terms mt ON mt.term_id = t.id
        WHERE mt.movie_id = ? AND t.taxonomy = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(movie_id)
    .bind(taxonomy)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Which of these TMDb IDs are already tracked?
pub async fn existing_tmdb_ids(pool: &SqlitePool, tmdb_ids: &[i64]) -> Result<HashSet<i64>> {
    let mut existing = HashSet::new();

    for tmdb_id in tmdb_ids {
        let row: Option<(i64,)> = sqlx::query_as("SELECT tmdb_id FROM movies WHERE tmdb_id = ?")
            .bind(tmdb_id)
            .fetch_optional(pool)
            .await?;

        if let Some((found,)) = row {
            existing.insert(found);
        }
    }

    Ok(existing)
}
