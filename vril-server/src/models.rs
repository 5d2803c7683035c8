//! API-facing entity blocks
//!
//! The stored records carry everything; these blocks are the shapes the
//! REST surface actually returns, with taxonomy names and image paths
//! joined in.

use crate::db::{articles, assets, movies, terms};
use serde::Serialize;
use sqlx::SqlitePool;
use vril_common::Result;

/// Listing row for a movie
#[derive(Debug, Clone, Serialize)]
pub struct MovieSummary {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub release_year: Option<i32>,
    pub to_watch: bool,
    pub poster: Option<String>,
    pub genres: Vec<String>,
}

impl MovieSummary {
    pub async fn build(pool: &SqlitePool, movie: &movies::Movie) -> Result<Self> {
        let genres = movies::movie_term_names(pool, movie.id, terms::TAX_GENRE).await?;
        let poster = assets::find_asset(pool, movie.id, assets::KIND_POSTER)
            .await?
            .map(|a| a.file_path);

        Ok(Self {
            id: movie.id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            release_year: release_year(movie.release_date.as_deref()),
            to_watch: movie.to_watch,
            poster,
            genres,
        })
    }
}

/// Full detail view for a movie
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub synopsis: String,
    pub tagline: String,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub runtime_minutes: i64,
    pub rating: String,
    pub budget: i64,
    pub box_office: i64,
    pub website: String,
    pub director: String,
    pub writer: String,
    pub to_watch: bool,
    pub genres: Vec<String>,
    pub production_companies: Vec<String>,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MovieDetail {
    pub async fn build(pool: &SqlitePool, movie: &movies::Movie) -> Result<Self> {
        let genres = movies::movie_term_names(pool, movie.id, terms::TAX_GENRE).await?;
        let production_companies =
            movies::movie_term_names(pool, movie.id, terms::TAX_COMPANY).await?;

        let mut poster = None;
        let mut backdrop = None;
        for asset in assets::find_for_movie(pool, movie.id).await? {
            match asset.kind.as_str() {
                assets::KIND_POSTER => poster = Some(asset.file_path),
                assets::KIND_BACKDROP => backdrop = Some(asset.file_path),
                _ => {}
            }
        }

        Ok(Self {
            id: movie.id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            synopsis: movie.synopsis.clone(),
            tagline: movie.tagline.clone(),
            release_date: movie.release_date.clone(),
            release_year: release_year(movie.release_date.as_deref()),
            runtime_minutes: movie.runtime_minutes,
            rating: movie.rating.clone(),
            budget: movie.budget,
            box_office: movie.box_office,
            website: movie.website.clone(),
            director: movie.director.clone(),
            writer: movie.writer.clone(),
            to_watch: movie.to_watch,
            genres,
            production_companies,
            poster,
            backdrop,
            created_at: movie.created_at.clone(),
            updated_at: movie.updated_at.clone(),
        })
    }
}

/// Listing/detail view for an article
#[derive(Debug, Clone, Serialize)]
pub struct ArticleBlock {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub read: bool,
    pub favorite: bool,
    pub tags: Vec<i64>,
    pub created_at: String,
}

impl ArticleBlock {
    pub async fn build(pool: &SqlitePool, article: &articles::Article) -> Result<Self> {
        let tags = articles::article_term_ids(pool, article.id).await?;

        Ok(Self {
            id: article.id,
            url: article.url.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            read: article.read,
            favorite: article.favorite,
            tags,
            created_at: article.created_at.clone(),
        })
    }
}

fn release_year(release_date: Option<&str>) -> Option<i32> {
    release_date.and_then(|d| d.get(0..4)).and_then(|y| y.parse().ok())
}
