//! vril-server library interface
//!
//! Exposes the application state and router so integration tests can
//! drive the service without binding a socket.

pub mod api;
pub mod clients;
pub mod db;
pub mod error;
pub mod ingest;
pub mod media;
pub mod models;
pub mod text;

pub use crate::error::{ApiError, ApiResult};

use crate::clients::{PageMetaClient, TmdbClient};
use crate::media::MediaStore;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::services::ServeDir;

/// Application state shared across handlers
///
/// Constructed once at startup and injected everywhere; no global
/// singletons hold the collaborators.
#[derive(Clone)]
pub struct AppState {
    /// Content store connection pool
    pub db: SqlitePool,
    /// External metadata client (TMDb)
    pub tmdb: TmdbClient,
    /// Article page scraper
    pub page_meta: PageMetaClient,
    /// Blob store + optimizer for movie images
    pub media: MediaStore,
    /// Include timing metadata in responses
    pub debug: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tmdb: TmdbClient,
        page_meta: PageMetaClient,
        media: MediaStore,
        debug: bool,
    ) -> Self {
        Self {
            db,
            tmdb,
            page_meta,
            media,
            debug,
            startup_time: Utc::now(),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let media_dir = state.media.root().to_path_buf();

    Router::new()
        .merge(api::movie_routes())
        .merge(api::article_routes())
        .merge(api::auth_routes())
        .merge(api::health_routes())
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(state)
}
