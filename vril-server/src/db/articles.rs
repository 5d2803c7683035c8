//! Article persistence
//!
//! Articles are uniquely keyed by their normalized URL. Ordering is
//! oldest-first by row ID, matching how a read-later queue is consumed.

use sqlx::SqlitePool;
use vril_common::Result;

/// Stored article record
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub read: bool,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Field set written by the ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct ArticleFields {
    pub url: String,
    pub title: String,
    pub description: String,
    pub read: bool,
    pub favorite: bool,
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub tag: Option<i64>,
    pub keyword: Option<String>,
    pub read: Option<bool>,
    pub favorite: Option<bool>,
    pub page: i64,
    pub count: i64,
}

/// Normalize an article URL for deduplication
///
/// Trims whitespace and drops the fragment; two links to the same page
/// that differ only by `#section` are the same article. Query strings are
/// kept since they can select entirely different content.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    match trimmed.split_once('#') {
        Some((base, _fragment)) => base.to_string(),
        None => trimmed.to_string(),
    }
}

const ARTICLE_COLUMNS: &str =
    "id, url, title, description, read, favorite, created_at, updated_at";

/// Insert or update an article by normalized URL, returning the row ID
pub async fn upsert_article(pool: &SqlitePool, fields: &ArticleFields) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO articles (url, title, description, read, favorite, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT (url) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            read = excluded.read,
            favorite = excluded.favorite,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(normalize_url(&fields.url))
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.read)
    .bind(fields.favorite)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Load an article by row ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(&format!(
        "SELECT {} FROM articles WHERE id = ?",
        ARTICLE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(article)
}

/// Load an article by normalized URL (the dedupe lookup)
pub async fn find_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(&format!(
        "SELECT {} FROM articles WHERE url = ?",
        ARTICLE_COLUMNS
    ))
    .bind(normalize_url(url))
    .fetch_optional(pool)
    .await?;

    Ok(article)
}

/// Query articles with filters and pagination, oldest first
pub async fn query_articles(
    pool: &SqlitePool,
    filter: &ArticleFilter,
) -> Result<(Vec<Article>, i64)> {
    let count = filter.count.max(1);
    let offset = (filter.page.max(1) - 1) * count;
    let keyword = filter
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());

    const WHERE_CLAUSE: &str = r#"
        (?1 IS NULL OR id IN (SELECT article_id FROM article_terms WHERE term_id = ?1))
        AND (?2 IS NULL OR title LIKE '%' || ?2 || '%' OR description LIKE '%' || ?2 || '%')
        AND (?3 IS NULL OR read = ?3)
        AND (?4 IS NULL OR favorite = ?4)
    "#;

    let articles = sqlx::query_as::<_, Article>(&format!(
        "SELECT {} FROM articles WHERE {} ORDER BY id ASC LIMIT ?5 OFFSET ?6",
        ARTICLE_COLUMNS, WHERE_CLAUSE
    ))
    .bind(filter.tag)
    .bind(keyword)
    .bind(filter.read)
    .bind(filter.favorite)
    .bind(count)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM articles WHERE {}",
        WHERE_CLAUSE
    ))
    .bind(filter.tag)
    .bind(keyword)
    .bind(filter.read)
    .bind(filter.favorite)
    .fetch_one(pool)
    .await?;

    Ok((articles, total))
}

/// Update the read/favorite flags (only the provided ones)
pub async fn set_flags(
    pool: &SqlitePool,
    id: i64,
    read: Option<bool>,
    favorite: Option<bool>,
) -> Result<bool> {
    let affected = sqlx::query(
        r#"
        UPDATE articles SET
            read = COALESCE(?, read),
            favorite = COALESCE(?, favorite),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(read)
    .bind(favorite)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Delete an article and its taxonomy edges
pub async fn delete_article(pool: &SqlitePool, id: i64) -> Result<bool> {
    sqlx::query("DELETE FROM article_terms WHERE article_id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    let affected = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Replace an article's tag assignments
pub async fn set_article_terms(pool: &SqlitePool, article_id: i64, term_ids: &[i64]) -> Result<()> {
    sqlx::query("DELETE FROM article_terms WHERE article_id = ?")
        .bind(article_id)
        .execute(pool)
        .await?;

    for term_id in term_ids {
        sqlx::query(
            r#"
            INSERT INTO article_terms (article_id, term_id) VALUES (?, ?)
            ON CONFLICT (article_id, term_id) DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(term_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Term IDs assigned to an article
pub async fn article_term_ids(pool: &SqlitePool, article_id: i64) -> Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT term_id FROM article_terms WHERE article_id = ? ORDER BY term_id")
            .bind(article_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vril_common::db::init_memory_pool;

    #[test]
    fn url_normalization_strips_fragment_only() {
        assert_eq!(
            normalize_url(" https://example.com/post#section-2 "),
            "https://example.com/post"
        );
        assert_eq!(
            normalize_url("https://example.com/post?page=2"),
            "https://example.com/post?page=2"
        );
    }

    #[tokio::test]
    async fn fragment_variants_dedupe_to_one_article() {
        let pool = init_memory_pool().await.expect("pool");

        let first = upsert_article(
            &pool,
            &ArticleFields {
                url: "https://example.com/post".to_string(),
                title: "Post".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let second = upsert_article(
            &pool,
            &ArticleFields {
                url: "https://example.com/post#comments".to_string(),
                title: "Post".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn flag_updates_are_partial() {
        let pool = init_memory_pool().await.expect("pool");

        let id = upsert_article(
            &pool,
            &ArticleFields {
                url: "https://example.com/a".to_string(),
                title: "A".to_string(),
                favorite: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // set read without touching favorite
        assert!(set_flags(&pool, id, Some(true), None).await.unwrap());

        let article = find_by_id(&pool, id).await.unwrap().expect("article");
        assert!(article.read);
        assert!(article.favorite);

        // unknown ID reports no update
        assert!(!set_flags(&pool, 9999, Some(true), None).await.unwrap());
    }

    #[tokio::test]
    async fn filters_combine() {
        let pool = init_memory_pool().await.expect("pool");

        for (url, read, favorite) in [
            ("https://example.com/1", false, false),
            ("https://example.com/2", true, false),
            ("https://example.com/3", true, true),
        ] {
            upsert_article(
                &pool,
                &ArticleFields {
                    url: url.to_string(),
                    title: url.to_string(),
                    read,
                    favorite,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let filter = ArticleFilter {
            read: Some(true),
            favorite: Some(false),
            page: 1,
            count: 10,
            ..Default::default()
        };
        let (articles, total) = query_articles(&pool, &filter).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(articles[0].url, "https://example.com/2");
    }
}
