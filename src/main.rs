use anyhow::Result;
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use std::{io::ErrorKind, path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use bookvault::assets::http::HttpAssetStore;
use bookvault::auth::TokenVerifier;
use bookvault::services::catalog_service::CatalogService;
use bookvault::staging::StagingArea;
use bookvault::store::sqlite::SqliteCatalogStore;
use bookvault::{config, routes, state, store};

/// Room for multipart boundaries and text fields on top of the two per-asset
/// bounds when sizing the request body limit.
const BODY_LIMIT_SLACK: u64 = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!(
        host = %cfg.host,
        port = cfg.port,
        database_url = %cfg.database_url,
        staging_dir = %cfg.staging_dir,
        asset_store_url = %cfg.asset_store_url,
        "Starting bookvault"
    );

    // --- Ensure staging directory exists ---
    let staging = StagingArea::new(&cfg.staging_dir, cfg.max_asset_bytes);
    staging.ensure_root().await?;

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");

    // Create parent directory if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx will not create the database file on its own
    match std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(db_path)
    {
        Ok(_) => tracing::debug!("Database file can be created/opened successfully."),
        Err(e) => tracing::warn!("Failed to open database file manually: {}", e),
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Apply schema (idempotent statements, safe on every start) ---
    store::sqlite::apply_migrations(&db).await?;

    // --- Initialize core services ---
    let assets = Arc::new(HttpAssetStore::new(
        cfg.asset_store_url.clone(),
        cfg.asset_public_url.clone(),
        Duration::from_secs(cfg.upload_timeout_secs),
    )?);
    let catalog = CatalogService::new(Arc::new(SqliteCatalogStore::new(db.clone())), assets);
    let verifier = TokenVerifier::new(&cfg.jwt_secret);
    let app_state = state::AppState::new(catalog, staging, verifier);

    // --- Build router ---
    let body_limit = (cfg.max_asset_bytes * 2 + BODY_LIMIT_SLACK) as usize;
    let app: Router = routes::routes::routes(body_limit).with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
