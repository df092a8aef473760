use std::sync::Arc;

use anyhow::Context;
use artisan_storefront::{
    AppState,
    config::AppConfig,
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    telemetry,
};
use tokio::net::TcpListener;

/// main
///
/// Loads configuration, installs logging, opens the store and serves the storefront.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; real environment variables win.
    dotenv::dotenv().ok();
    let config = AppConfig::load().context("invalid configuration")?;

    telemetry::init(&config.env);
    tracing::info!("Application starting in {:?} mode", config.env);

    let repo: RepositoryState = match &config.db_url {
        Some(url) => {
            let repo = PostgresRepository::connect(url)
                .await
                .context("failed to connect to Postgres, check DATABASE_URL")?;
            repo.migrate().await.context("failed to run migrations")?;
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(InMemoryRepository::new())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
