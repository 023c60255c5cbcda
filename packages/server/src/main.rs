use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::CorsLayer;
use tracing::{Level, info};

use server::cache::FragmentCache;
use server::checkers::wasm::ScriptRuntime;
use server::config::AppConfig;
use server::database::init_db;
use server::mail::LogMailer;
use server::seed::seed_role_permissions;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    seed_role_permissions(&db).await?;

    let files = common::storage::FileStore::new(
        config.storage.files_dir.clone(),
        config.storage.max_file_size,
    )
    .await?;

    let state = AppState {
        db,
        files: Arc::new(files),
        scripts: Arc::new(ScriptRuntime::new()),
        cache: Arc::new(FragmentCache::new(config.cache.capacity)),
        mailer: Arc::new(LogMailer),
        config: Arc::new(config.clone()),
    };

    let mut app = server::build_router(state);

    if !config.server.cors.allow_origins.is_empty() {
        let origins: Vec<HeaderValue> = config
            .server
            .cors
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        let cors = CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
            .max_age(std::time::Duration::from_secs(config.server.cors.max_age));
        app = app.layer(cors);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
