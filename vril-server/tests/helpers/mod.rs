//! Shared test helpers: in-memory app state and a stub TMDb server

// not every test crate uses every helper
#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use vril_server::clients::{PageMetaClient, TmdbClient};
use vril_server::media::MediaStore;
use vril_server::AppState;

/// Counters exposed by the stub upstream
#[derive(Clone, Default)]
pub struct StubState {
    pub image_requests: Arc<AtomicUsize>,
}

impl StubState {
    pub fn image_request_count(&self) -> usize {
        self.image_requests.load(Ordering::SeqCst)
    }
}

/// Spawn a stub TMDb + article server on an ephemeral port
///
/// Canned data: movie 603 (The Matrix, full details + credits + images),
/// movie 777 (details fine, credits endpoint 500s), everything else 404.
pub async fn spawn_stub_upstream() -> (String, StubState) {
    let state = StubState::default();

    let router = Router::new()
        .route("/search/movie", get(stub_search))
        .route("/movie/:id", get(stub_details))
        .route("/movie/:id/credits", get(stub_credits))
        .route("/t/p/:size/:file", get(stub_image))
        .route("/article/good", get(stub_article))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });

    (format!("http://{}", addr), state)
}

async fn stub_search(Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("query").cloned().unwrap_or_default();

    if query.to_lowercase().contains("matrix") {
        Json(json!({
            "results": [
                {
                    "id": 603,
                    "title": "The Matrix",
                    "overview": "A computer hacker learns about the true nature of reality.",
                    "release_date": "1999-03-31",
                    "poster_path": "/matrix-poster.jpg",
                },
                {
                    "id": 604,
                    "title": "The Matrix Reloaded",
                    "overview": "Neo and his allies race against time.",
                    "release_date": "2003-05-15",
                    "poster_path": "/reloaded-poster.jpg",
                },
            ],
            "total_pages": 1,
            "total_results": 2,
        }))
        .into_response()
    } else {
        Json(json!({"results": [], "total_pages": 0, "total_results": 0})).into_response()
    }
}

async fn stub_details(Path(id): Path<i64>) -> Response {
    match id {
        603 => Json(json!({
            "id": 603,
            "title": "The Matrix",
            "overview": "A computer hacker learns about the true nature of reality.",
            "tagline": "The fight for the future begins.",
            "release_date": "1999-03-31",
            "runtime": 136,
            "budget": 63000000,
            "revenue": 463517383,
            "homepage": "http://www.warnerbros.com/matrix",
            "genres": [
                {"id": 28, "name": "Action"},
                {"id": 878, "name": "Science Fiction"},
            ],
            "production_companies": [
                {"id": 79, "name": "Village Roadshow Pictures"},
            ],
            "poster_path": "/matrix-poster.jpg",
            "backdrop_path": "/matrix-backdrop.jpg",
            "release_dates": {
                "results": [
                    {"iso_3166_1": "US", "release_dates": [{"certification": "R"}]},
                ]
            },
        }))
        .into_response(),
        777 => Json(json!({
            "id": 777,
            "title": "Creditless",
            "overview": "A film that lost its crew records.",
            "genres": [{"id": 18, "name": "Drama"}],
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"status_message": "The resource you requested could not be found."})),
        )
            .into_response(),
    }
}

async fn stub_credits(Path(id): Path<i64>) -> Response {
    match id {
        603 => Json(json!({
            "crew": [
                {"name": "Lana Wachowski", "department": "Directing", "job": "Director"},
                {"name": "Lilly Wachowski", "department": "Directing", "job": "Director"},
                {"name": "Lana Wachowski", "department": "Writing", "job": "Screenplay"},
                {"name": "Lilly Wachowski", "department": "Writing", "job": "Screenplay"},
            ]
        }))
        .into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status_message": "upstream exploded"})),
        )
            .into_response(),
    }
}

async fn stub_image(State(state): State<StubState>) -> Response {
    state.image_requests.fetch_add(1, Ordering::SeqCst);

    (
        [(header::CONTENT_TYPE, "image/jpeg")],
        vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
    )
        .into_response()
}

async fn stub_article() -> Html<&'static str> {
    Html(
        "<html><head>\
         <title>Stub Article &amp; Its Title</title>\
         <meta name=\"description\" content=\"A canned description.\">\
         </head><body>content</body></html>",
    )
}

/// App state over an in-memory database, clients pointed at `tmdb_base`
pub async fn test_state(tmdb_base: &str) -> (AppState, tempfile::TempDir) {
    let pool = vril_common::db::init_memory_pool().await.expect("pool");

    let tmdb = TmdbClient::with_urls(
        "test-key".to_string(),
        tmdb_base.to_string(),
        format!("{}/t/p", tmdb_base),
    )
    .expect("tmdb client");

    let page_meta = PageMetaClient::new().expect("page meta client");

    let media_dir = tempfile::tempdir().expect("tempdir");
    let media = MediaStore::new(media_dir.path().to_path_buf());

    let state = AppState::new(pool, tmdb, page_meta, media, false);

    (state, media_dir)
}

/// Seed credentials and return a valid bearer token
pub async fn seed_token(pool: &sqlx::SqlitePool) -> String {
    vril_common::auth::seed_credentials(pool, "editor", "hunter2")
        .await
        .expect("seed credentials");

    vril_common::auth::issue_token(pool, "editor")
        .await
        .expect("issue token")
}

/// Drive one request through the router and parse the JSON body
pub async fn request_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };

    (status, body)
}

/// Shorthand for an empty-body request
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Shorthand for an empty-body request with a bearer token
pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request")
}

/// Shorthand for an authed JSON-body request
pub fn authed_json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("request")
}
