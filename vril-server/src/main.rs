//! vril-server - movie and read-later tracker service
//!
//! REST API over a SQLite content store, ingesting movie metadata from
//! TMDb and article metadata from arbitrary URLs.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vril_common::config;
use vril_server::clients::{PageMetaClient, TmdbClient};
use vril_server::media::MediaStore;
use vril_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting vril-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = config::load_toml_config(None);
    let server_config = config::resolve(toml_config);
    info!("Data dir: {}", server_config.data_dir.display());

    let db_path = server_config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = vril_common::db::init_database_pool(&db_path).await?;

    // seed auth credentials from config so token issuance works offline
    match (
        &server_config.toml.auth_username,
        &server_config.toml.auth_password,
    ) {
        (Some(username), Some(password)) => {
            vril_common::auth::seed_credentials(&db_pool, username, password).await?;
            info!("Auth credentials seeded for {}", username);
        }
        _ => {
            tracing::warn!("No auth credentials configured; write endpoints will reject all tokens");
        }
    }

    let api_key = config::resolve_tmdb_api_key(&db_pool, &server_config.toml).await?;
    let tmdb = TmdbClient::new(api_key)?;
    let page_meta = PageMetaClient::new()?;
    let media = MediaStore::new(server_config.media_dir());

    let state = AppState::new(db_pool, tmdb, page_meta, media, server_config.debug);
    let app = vril_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_address).await?;
    info!("Listening on http://{}", server_config.bind_address);
    info!("Health check: http://{}/health", server_config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
