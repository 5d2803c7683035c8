//! Article API handlers
//!
//! Read-later queue: public cached listing and tag index, authed writes
//! running the article ingestion pipeline.

use super::{params, respond, RequireAuth, API_PREFIX};
use crate::db::{articles, terms};
use crate::error::{ApiError, ApiResult};
use crate::ingest::ArticleIngestor;
use crate::models::ArticleBlock;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use vril_common::{cache, watermark, Envelope};

/// Normalized GET /articles parameters
#[derive(Debug, Clone)]
pub struct ArticleListParams {
    pub page: i64,
    pub count: i64,
    pub tag: Option<i64>,
    pub keyword: Option<String>,
    pub read: Option<bool>,
    pub favorite: Option<bool>,
}

impl ArticleListParams {
    fn from_raw(raw: &HashMap<String, String>) -> Self {
        Self {
            page: params::int_or(raw, "page", 1).max(1),
            count: params::int_or(raw, "count", 50).max(1),
            tag: params::positive_int(raw, "tag"),
            keyword: params::non_empty(raw, "keyword"),
            read: params::opt_bool(raw, "read"),
            favorite: params::opt_bool(raw, "favorite"),
        }
    }

    fn normalized(&self) -> BTreeMap<String, String> {
        let mut normalized = BTreeMap::new();
        normalized.insert("page".to_string(), self.page.to_string());
        normalized.insert("count".to_string(), self.count.to_string());
        normalized.insert(
            "tag".to_string(),
            self.tag.map(|t| t.to_string()).unwrap_or_default(),
        );
        normalized.insert(
            "keyword".to_string(),
            self.keyword.clone().unwrap_or_default(),
        );
        normalized.insert(
            "read".to_string(),
            self.read.map(|r| r.to_string()).unwrap_or_default(),
        );
        normalized.insert(
            "favorite".to_string(),
            self.favorite.map(|f| f.to_string()).unwrap_or_default(),
        );

        normalized
    }
}

/// GET /api/v1/articles
pub async fn get_articles(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let params = ArticleListParams::from_raw(&raw);
    let mut res = Envelope::new();

    match list_articles(&state, &params).await {
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

async fn list_articles(
    state: &AppState,
    params: &ArticleListParams,
) -> ApiResult<serde_json::Value> {
    let cache_params = params.normalized();

    if let Some(cached) = cache::get(&state.db, "get_articles", &cache_params).await? {
        tracing::debug!("Serving article list from cache");
        return Ok(cached);
    }

    let filter = articles::ArticleFilter {
        tag: params.tag,
        keyword: params.keyword.clone(),
        read: params.read,
        favorite: params.favorite,
        page: params.page,
        count: params.count,
    };

    let (page, total) = articles::query_articles(&state.db, &filter).await?;

    let mut blocks = Vec::with_capacity(page.len());
    for article in &page {
        blocks.push(ArticleBlock::build(&state.db, article).await?);
    }

    let data = json!({
        "meta": {
            "post_count": page.len(),
            "total_posts": total,
        },
        "articles": blocks,
    });

    cache::put(&state.db, "get_articles", &cache_params, &data).await?;

    Ok(data)
}

/// POST /api/v1/articles body
#[derive(Debug, Deserialize)]
pub struct AddArticleRequest {
    pub url: String,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub favorite: bool,
}

/// POST /api/v1/articles
pub async fn add_article(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    payload: Result<Json<AddArticleRequest>, JsonRejection>,
) -> Response {
    let mut res = Envelope::new();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            res.set_error(format!("Invalid request body: {}", rejection), 400);
            return respond(res, state.debug);
        }
    };

    match ingest_article(&state, &request).await {
        Ok((article, created, warnings)) => {
            res.add_data("article", article).add_data("created", created);
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

async fn ingest_article(
    state: &AppState,
    request: &AddArticleRequest,
) -> ApiResult<(ArticleBlock, bool, Vec<String>)> {
    let url = request.url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ApiError::BadRequest(format!(
            "Invalid article URL: \"{}\"",
            request.url
        )));
    }

    let ingestor = ArticleIngestor {
        db: &state.db,
        page_meta: &state.page_meta,
    };

    let outcome = ingestor
        .ingest(url, &request.tags, request.read, request.favorite)
        .await?;

    let article = articles::find_by_id(&state.db, outcome.entity_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Article missing after persist".to_string()))?;
    let block = ArticleBlock::build(&state.db, &article).await?;

    Ok((block, outcome.created, outcome.warnings))
}

/// PATCH /api/v1/articles/{id}
pub async fn patch_article(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i64>,
    Query(raw): Query<HashMap<String, String>>,
) -> Response {
    let mut res = Envelope::new();

    match update_article_flags(&state, id, &raw).await {
        Ok(article) => {
            res.add_data("article", article);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn update_article_flags(
    state: &AppState,
    id: i64,
    raw: &HashMap<String, String>,
) -> ApiResult<ArticleBlock> {
    let read = params::opt_bool(raw, "read");
    let favorite = params::opt_bool(raw, "favorite");

    if read.is_none() && favorite.is_none() {
        return Err(ApiError::BadRequest(
            "No article status provided".to_string(),
        ));
    }

    let updated = articles::set_flags(&state.db, id, read, favorite).await?;
    if !updated {
        return Err(ApiError::BadRequest(format!(
            "Invalid article ID: \"{}\"",
            id
        )));
    }

    watermark::bump(&state.db).await?;

    let article = articles::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::Internal("Article missing after update".to_string()))?;

    Ok(ArticleBlock::build(&state.db, &article).await?)
}

/// DELETE /api/v1/articles/{id}
pub async fn delete_article(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i64>,
) -> Response {
    let mut res = Envelope::new();

    match remove_article(&state, id).await {
        Ok(()) => {
            res.add_data("deleted", true);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn remove_article(state: &AppState, id: i64) -> ApiResult<()> {
    let deleted = articles::delete_article(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::BadRequest(format!(
            "Invalid article ID: \"{}\"",
            id
        )));
    }

    watermark::bump(&state.db).await?;

    tracing::info!(article_id = id, "Article deleted");

    Ok(())
}

/// GET /api/v1/tags
pub async fn get_tags(State(state): State<AppState>) -> Response {
    let mut res = Envelope::new();

    match list_tags(&state).await {
        Ok(tags) => {
            res.add_data("tags", tags);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn list_tags(state: &AppState) -> ApiResult<serde_json::Value> {
    let cache_params = BTreeMap::new();

    if let Some(cached) = cache::get(&state.db, "get_tags", &cache_params).await? {
        return Ok(cached);
    }

    let tags = terms::list_article_tags(&state.db).await?;
    let data = serde_json::to_value(tags)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize tags: {}", e)))?;

    cache::put(&state.db, "get_tags", &cache_params, &data).await?;

    Ok(data)
}

/// Build article routes
pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route(
            &format!("{}/articles", API_PREFIX),
            get(get_articles).post(add_article),
        )
        .route(
            &format!("{}/articles/:id", API_PREFIX),
            axum::routing::patch(patch_article).delete(delete_article),
        )
        .route(&format!("{}/tags", API_PREFIX), get(get_tags))
}
