use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use super::settings::{DatabaseTarget, Settings};
use crate::application::health_service::DatabaseProbe;
use crate::domain::error::DomainError;

pub(crate) async fn create_pool(settings: &Settings) -> Result<PgPool> {
    let options = connect_options(&settings.database)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(settings.db_acquire_timeout_secs))
        .connect_with(options)
        .await
        .context("failed to connect to PostgreSQL")?;

    info!("connected to PostgreSQL");
    Ok(pool)
}

pub(crate) async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations completed");
    Ok(())
}

fn connect_options(target: &DatabaseTarget) -> Result<PgConnectOptions> {
    let options = match target {
        DatabaseTarget::Url(url) => {
            PgConnectOptions::from_str(url).context("DATABASE_URL is not a valid PostgreSQL URL")?
        }
        DatabaseTarget::Parts {
            host,
            port,
            user,
            password,
            name,
        } => {
            let options = PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .database(name);
            match password {
                Some(password) => options.password(password),
                None => options,
            }
        }
    };
    Ok(options)
}

/// Liveness probe used by `/health`.
#[derive(Debug, Clone)]
pub(crate) struct PostgresProbe {
    pool: PgPool,
}

impl PostgresProbe {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbe for PostgresProbe {
    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| DomainError::Storage(err.to_string()))
    }
}
