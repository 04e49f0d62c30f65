use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use application::health_service::HealthService;
use application::post_service::PostService;
use data::repositories::postgres::post_repository::PostgresPostRepository;
use infrastructure::database::{PostgresProbe, create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;
use presentation::AppState;

#[derive(Debug, Parser)]
#[command(name = "posts-api", about = "Posts record-management REST service")]
struct Args {
    /// Env file to load before reading configuration. Defaults to `.env`
    /// in the working directory when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match &args.config {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let settings = Settings::from_env()?;
    init_logging(&settings.log_level, settings.log_format)?;
    info!(environment = ?settings.environment, "starting posts-api");

    let pool = create_pool(&settings).await?;
    if settings.runs_migrations() {
        run_migrations(&pool).await?;
    }

    let repo = PostgresPostRepository::new(
        pool.clone(),
        Duration::from_secs(settings.db_query_timeout_secs),
    );
    let post_service = Arc::new(PostService::new(Arc::new(repo)));
    let health_service = Arc::new(HealthService::new(
        Arc::new(PostgresProbe::new(pool.clone())),
        HealthService::DEFAULT_CHECK_TIMEOUT,
    ));
    let state = AppState::new(post_service, health_service);

    server::run_http(&settings, state).await?;

    pool.close().await;
    info!("database pool closed");
    Ok(())
}
