//! Ingestion pipeline tests against a stub upstream
//!
//! The stub serves canned TMDb payloads and image bytes on an ephemeral
//! port; these tests exercise the full fetch → dedupe → resolve →
//! images → persist flow, including the degraded paths.

mod helpers;

use axum::http::StatusCode;
use helpers::{
    authed_request, request_json, seed_token, spawn_stub_upstream, test_state,
};
use serde_json::json;
use vril_server::build_router;
use vril_server::clients::PageMetaClient;
use vril_server::db::{articles, assets, movies};
use vril_server::ingest::{ArticleIngestor, MovieIngestor};

#[tokio::test]
async fn add_movie_end_to_end() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, media_dir) = test_state(&base).await;
    let token = seed_token(&state.db).await;
    let app = build_router(state);

    let (status, body) =
        request_json(&app, authed_request("POST", "/api/v1/movies/603", &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let movie = &body["data"]["movie"];
    assert_eq!(movie["title"], json!("The Matrix"));
    assert_eq!(movie["tmdb_id"], json!(603));
    assert_eq!(movie["rating"], json!("R"));
    assert_eq!(movie["director"], json!("Lana Wachowski, Lilly Wachowski"));
    assert_eq!(movie["writer"], json!("Lana Wachowski, Lilly Wachowski"));

    let genres = movie["genres"].as_array().expect("genres");
    assert!(!genres.is_empty(), "genres should be populated");
    assert!(genres.contains(&json!("Action")));

    assert_eq!(body["data"]["created"], json!(true));

    // images were stored and recorded
    assert_eq!(movie["poster"], json!("media/the-matrix-603-poster.jpg"));
    assert!(media_dir.path().join("the-matrix-603-poster.jpg").exists());
    assert!(media_dir.path().join("the-matrix-603-backdrop.jpg").exists());
}

#[tokio::test]
async fn ingesting_twice_is_idempotent() {
    let (base, stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;

    let ingestor = MovieIngestor {
        db: &state.db,
        tmdb: &state.tmdb,
        media: &state.media,
    };

    let first = ingestor.ingest(603, None).await.expect("first ingest");
    let second = ingestor.ingest(603, None).await.expect("second ingest");

    // same entity both times
    assert_eq!(first.entity_id, second.entity_id);
    assert!(first.created);
    assert!(!second.created);

    // exactly one movie row
    let (movie_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(movie_count, 1);

    // no duplicate terms: 2 genres + 1 production company
    let (term_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM terms")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(term_count, 3);

    // no duplicate assets, and no re-download of unchanged images
    let stored = assets::find_for_movie(&state.db, first.entity_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stub.image_request_count(), 2, "unchanged images should not be refetched");
}

#[tokio::test]
async fn credits_failure_degrades_instead_of_failing() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;

    let ingestor = MovieIngestor {
        db: &state.db,
        tmdb: &state.tmdb,
        media: &state.media,
    };

    // movie 777: details succeed, credits endpoint 500s
    let outcome = ingestor.ingest(777, None).await.expect("ingest succeeds");

    assert!(!outcome.warnings.is_empty(), "credits failure should warn");

    let movie = movies::find_by_id(&state.db, outcome.entity_id)
        .await
        .unwrap()
        .expect("movie persisted");
    assert_eq!(movie.title, "Creditless");
    assert_eq!(movie.director, "");
    assert_eq!(movie.writer, "");
}

#[tokio::test]
async fn details_failure_aborts_with_500_envelope() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;
    let token = seed_token(&state.db).await;
    let app = build_router(state);

    let (status, body) =
        request_json(&app, authed_request("POST", "/api/v1/movies/999", &token)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert!(body["data"]["error"]
        .as_str()
        .expect("error")
        .contains("fetch-details"));
}

#[tokio::test]
async fn query_tmdb_annotates_already_added_results() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;
    let token = seed_token(&state.db).await;

    // track 603 first
    let ingestor = MovieIngestor {
        db: &state.db,
        tmdb: &state.tmdb,
        media: &state.media,
    };
    ingestor.ingest(603, None).await.expect("ingest");

    let app = build_router(state);

    let (status, body) = request_json(
        &app,
        authed_request("POST", "/api/v1/query-tmdb?title=matrix", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["data"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);

    let added: Vec<(i64, bool)> = results
        .iter()
        .map(|r| (r["id"].as_i64().unwrap(), r["added"].as_bool().unwrap()))
        .collect();
    assert!(added.contains(&(603, true)));
    assert!(added.contains(&(604, false)));

    assert_eq!(body["data"]["meta"]["total_results"], json!(2));
}

#[tokio::test]
async fn delete_removes_movie_and_media_files() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, media_dir) = test_state(&base).await;
    let token = seed_token(&state.db).await;

    let ingestor = MovieIngestor {
        db: &state.db,
        tmdb: &state.tmdb,
        media: &state.media,
    };
    let outcome = ingestor.ingest(603, None).await.expect("ingest");

    let pool = state.db.clone();
    let app = build_router(state);

    let poster = media_dir.path().join("the-matrix-603-poster.jpg");
    assert!(poster.exists());

    let uri = format!("/api/v1/movies/{}", outcome.entity_id);
    let (status, body) = request_json(&app, authed_request("DELETE", &uri, &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], json!(true));

    assert!(movies::find_by_id(&pool, outcome.entity_id)
        .await
        .unwrap()
        .is_none());
    assert!(assets::find_for_movie(&pool, outcome.entity_id)
        .await
        .unwrap()
        .is_empty());
    assert!(!poster.exists(), "stored image should be unlinked");
}

#[tokio::test]
async fn article_ingest_scrapes_title_and_description() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;

    let ingestor = ArticleIngestor {
        db: &state.db,
        page_meta: &state.page_meta,
    };

    let url = format!("{}/article/good", base);
    let outcome = ingestor.ingest(&url, &[], false, false).await.expect("ingest");

    let article = articles::find_by_id(&state.db, outcome.entity_id)
        .await
        .unwrap()
        .expect("article");
    assert_eq!(article.title, "Stub Article & Its Title");
    assert_eq!(article.description, "A canned description.");
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn unreachable_article_falls_back_to_url_as_title() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;

    let ingestor = ArticleIngestor {
        db: &state.db,
        page_meta: &state.page_meta,
    };

    // connection refused, quickly
    let url = "http://127.0.0.1:9/article/missing";
    let outcome = ingestor.ingest(url, &[], false, false).await.expect("ingest");

    assert!(!outcome.warnings.is_empty());

    let article = articles::find_by_id(&state.db, outcome.entity_id)
        .await
        .unwrap()
        .expect("article");
    assert_eq!(article.title, url);
}

#[tokio::test]
async fn article_ingest_dedupes_by_normalized_url() {
    let (base, _stub) = spawn_stub_upstream().await;
    let (state, _media) = test_state(&base).await;

    let ingestor = ArticleIngestor {
        db: &state.db,
        page_meta: &state.page_meta,
    };

    let url = format!("{}/article/good", base);
    let with_fragment = format!("{}#section", url);

    let first = ingestor.ingest(&url, &[], false, false).await.expect("first");
    let second = ingestor
        .ingest(&with_fragment, &[], true, false)
        .await
        .expect("second");

    assert_eq!(first.entity_id, second.entity_id);
    assert!(!second.created);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // the second ingest's flags landed
    let article = articles::find_by_id(&state.db, first.entity_id)
        .await
        .unwrap()
        .expect("article");
    assert!(article.read);
}

#[tokio::test]
async fn page_meta_client_returns_none_for_missing_title() {
    let client = PageMetaClient::new().expect("client");

    // connection refused
    let meta = client.fetch_page_meta("http://127.0.0.1:9/nope").await;
    assert!(meta.is_none());
}
