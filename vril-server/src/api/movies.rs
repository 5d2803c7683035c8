//! Movie API handlers
//!
//! GET list/detail are public and served through the query cache; writes
//! require auth, run the ingestion pipeline where appropriate, and bump
//! the watermark so every cached read is invalidated.

use super::{params, respond, RequireAuth, API_PREFIX};
use crate::db::{assets, movies};
use crate::error::{ApiError, ApiResult};
use crate::ingest::MovieIngestor;
use crate::models::{MovieDetail, MovieSummary};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use vril_common::{cache, watermark, Envelope};

/// Normalized GET /movies parameters
#[derive(Debug, Clone)]
pub struct MovieListParams {
    pub page: i64,
    pub count: i64,
    pub genre: Option<i64>,
    pub keyword: Option<String>,
    pub to_watch: Option<bool>,
}

impl MovieListParams {
    /// Coerce raw query params, garbage falling back to defaults
    fn from_raw(raw: &HashMap<String, String>) -> Self {
        Self {
            page: params::int_or(raw, "page", 1).max(1),
            count: params::int_or(raw, "count", 50).max(1),
            genre: params::positive_int(raw, "genre"),
            keyword: params::non_empty(raw, "keyword"),
            to_watch: params::opt_bool(raw, "to_watch"),
        }
    }

    /// Canonical form for cache keying: every parameter present, values
    /// as canonical strings
    fn normalized(&self) -> BTreeMap<String, String> {
        let mut normalized = BTreeMap::new();
        normalized.insert("page".to_string(), self.page.to_string());
        normalized.insert("count".to_string(), self.count.to_string());
        normalized.insert(
            "genre".to_string(),
            self.genre.map(|g| g.to_string()).unwrap_or_default(),
        );
        normalized.insert(
            "keyword".to_string(),
            self.keyword.clone().unwrap_or_default(),
        );
        normalized.insert(
            "to_watch".to_string(),
            self.to_watch.map(|w| w.to_string()).unwrap_or_default(),
        );

        normalized
    }
}

/// GET /api/v1/movies
pub async fn get_movies(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let params = MovieListParams::from_raw(&raw);
    let mut res = Envelope::new();

    match list_movies(&state, &params).await {
        Ok(data) => {
            if let Some(object) = data.as_object() {
                for (key, value) in object {
                    res.add_data(key, value);
                }
            }
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn list_movies(state: &AppState, params: &MovieListParams) -> ApiResult<serde_json::Value> {
    let cache_params = params.normalized();

    if let Some(cached) = cache::get(&state.db, "get_movies", &cache_params).await? {
        tracing::debug!("Serving movie list from cache");
        return Ok(cached);
    }

    let filter = movies::MovieFilter {
        genre: params.genre,
        keyword: params.keyword.clone(),
        to_watch: params.to_watch,
        page: params.page,
        count: params.count,
    };

    let (page, total) = movies::query_movies(&state.db, &filter).await?;

    let mut blocks = Vec::with_capacity(page.len());
    for movie in &page {
        blocks.push(MovieSummary::build(&state.db, movie).await?);
    }

    let data = json!({
        "meta": {
            "post_count": page.len(),
            "total_posts": total,
        },
        "movies": blocks,
    });

    cache::put(&state.db, "get_movies", &cache_params, &data).await?;

    Ok(data)
}

/// GET /api/v1/movies/{id}
pub async fn get_movie(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut res = Envelope::new();

    match fetch_movie_detail(&state, id).await {
        Ok(data) => {
            res.add_data("movie", data);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn fetch_movie_detail(state: &AppState, id: i64) -> ApiResult<serde_json::Value> {
    let mut cache_params = BTreeMap::new();
    cache_params.insert("id".to_string(), id.to_string());

    if let Some(cached) = cache::get(&state.db, "get_movie", &cache_params).await? {
        return Ok(cached);
    }

    let movie = movies::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid movie ID: \"{}\"", id)))?;

    let detail = MovieDetail::build(&state.db, &movie).await?;
    let data = serde_json::to_value(detail)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize movie: {}", e)))?;

    cache::put(&state.db, "get_movie", &cache_params, &data).await?;

    Ok(data)
}

/// POST /api/v1/movies/{tmdb_id}
pub async fn add_movie(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(tmdb_id): Path<i64>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let to_watch = params::opt_bool(&raw, "to_watch");
    let mut res = Envelope::new();

    match ingest_movie(&state, tmdb_id, to_watch).await {
        Ok((movie, created, warnings)) => {
            res.add_data("movie", movie).add_data("created", created);
            if !warnings.is_empty() {
                res.add_data("warnings", warnings);
            }
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn ingest_movie(
    state: &AppState,
    tmdb_id: i64,
    to_watch: Option<bool>,
) -> ApiResult<(MovieDetail, bool, Vec<String>)> {
    if tmdb_id <= 0 {
        return Err(ApiError::BadRequest(format!(
            "Invalid TMDb ID: \"{}\"",
            tmdb_id
        )));
    }

    let ingestor = MovieIngestor {
        db: &state.db,
        tmdb: &state.tmdb,
        media: &state.media,
    };

    let outcome = ingestor.ingest(tmdb_id, to_watch).await?;

    let movie = movies::find_by_id(&state.db, outcome.entity_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Movie missing after persist".to_string()))?;
    let detail = MovieDetail::build(&state.db, &movie).await?;

    Ok((detail, outcome.created, outcome.warnings))
}

/// PATCH /api/v1/movies/{id}
///
/// Accepts either spelling: `to_watch` directly, or `watched` (its
/// negation) for clients that track the flag from the other side.
pub async fn patch_movie(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i64>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let mut res = Envelope::new();

    match update_watch_status(&state, id, &raw).await {
        Ok(movie) => {
            res.add_data("movie", movie);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn update_watch_status(
    state: &AppState,
    id: i64,
    raw: &HashMap<String, String>,
) -> ApiResult<MovieDetail> {
    let to_watch = params::opt_bool(raw, "to_watch")
        .or(params::opt_bool(raw, "watched").map(|watched| !watched))
        .ok_or_else(|| ApiError::BadRequest("No watch status provided".to_string()))?;

    let updated = movies::set_watch_flag(&state.db, id, to_watch).await?;
    if !updated {
        return Err(ApiError::BadRequest(format!("Invalid movie ID: \"{}\"", id)));
    }

    watermark::bump(&state.db).await?;

    let movie = movies::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal("Movie missing after update".to_string()))?;

    Ok(MovieDetail::build(&state.db, &movie).await?)
}

/// DELETE /api/v1/movies/{id}
pub async fn delete_movie(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i64>,
) -> Response {
    let mut res = Envelope::new();

    match remove_movie(&state, id).await {
        Ok(()) => {
            res.add_data("deleted", true);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn remove_movie(state: &AppState, id: i64) -> ApiResult<()> {
    let movie = movies::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid movie ID: \"{}\"", id)))?;

    // asset rows first, so their files can be unlinked
    let removed_assets = assets::delete_for_movie(&state.db, id).await?;
    for asset in &removed_assets {
        state.media.remove(&asset.file_path);
    }

    movies::delete_movie(&state.db, id).await?;
    watermark::bump(&state.db).await?;

    tracing::info!(movie_id = id, title = %movie.title, "Movie deleted");

    Ok(())
}

/// POST /api/v1/query-tmdb
///
/// Proxy search against TMDb, annotating each result with whether the
/// movie is already tracked.
pub async fn query_tmdb(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let mut res = Envelope::new();

    match search_tmdb(&state, &raw).await {
        Ok((meta, results)) => {
            res.add_data("meta", meta).add_data("results", results);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn search_tmdb(
    state: &AppState,
    raw: &HashMap<String, String>,
) -> ApiResult<(serde_json::Value, Vec<serde_json::Value>)> {
    let title = params::non_empty(raw, "title")
        .ok_or_else(|| ApiError::BadRequest("Missing search title".to_string()))?;
    let page = params::int_or(raw, "page", 1).max(1);

    let search_page = state
        .tmdb
        .search_by_title(&title, page)
        .await
        .map_err(|e| ApiError::Common(vril_common::Error::Upstream(e.to_string())))?;

    let tmdb_ids: Vec<i64> = search_page.results.iter().map(|r| r.id).collect();
    let already_added = movies::existing_tmdb_ids(&state.db, &tmdb_ids).await?;

    let results: Vec<serde_json::Value> = search_page
        .results
        .iter()
        .map(|result| {
            json!({
                "id": result.id,
                "title": result.title,
                "release_date": result.release_date,
                "overview": result.overview,
                "poster_path": result.poster_path,
                "added": already_added.contains(&result.id),
            })
        })
        .collect();

    let meta = json!({
        "result_count": results.len(),
        "total_pages": search_page.total_pages,
        "total_results": search_page.total_results,
    });

    Ok((meta, results))
}

/// Build movie routes
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{}/movies", API_PREFIX), get(get_movies))
        .route(
            &format!("{}/movies/:id", API_PREFIX),
            get(get_movie)
                .post(add_movie)
                .patch(patch_movie)
                .delete(delete_movie),
        )
        .route(
            &format!("{}/query-tmdb", API_PREFIX),
            axum::routing::post(query_tmdb),
        )
}
