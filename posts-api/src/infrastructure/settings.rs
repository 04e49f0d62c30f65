use anyhow::{Context, Result, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Where to find PostgreSQL: either a full URL or discrete connection
/// parameters (no URL escaping needed for passwords).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        name: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub database: DatabaseTarget,
    pub http_addr: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub http_request_body_limit_bytes: usize,
    pub http_concurrency_limit: usize,
    pub http_request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_query_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = parse_environment(
            &lookup("APP_ENV").unwrap_or_else(|| "staging".to_string()),
        )?;
        let database = parse_database_target(&lookup)?;

        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let cors_origins = parse_cors_origins(lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()));
        let log_level = lookup("LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());
        let log_format =
            parse_log_format(&lookup("LOG_FORMAT").unwrap_or_else(|| "compact".to_string()))?;

        let http_request_body_limit_bytes = parse_positive(
            &lookup,
            "HTTP_REQUEST_BODY_LIMIT_BYTES",
            1024 * 1024,
        )?;
        let http_concurrency_limit = parse_positive(&lookup, "HTTP_CONCURRENCY_LIMIT", 256)?;
        let http_request_timeout_secs = parse_positive(&lookup, "HTTP_REQUEST_TIMEOUT_SECS", 60)?;
        let db_max_connections = parse_positive(&lookup, "DB_MAX_CONNECTIONS", 10)?;
        let db_acquire_timeout_secs = parse_positive(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?;
        let db_query_timeout_secs = parse_positive(&lookup, "DB_QUERY_TIMEOUT_SECS", 10)?;

        Ok(Self {
            environment,
            database,
            http_addr,
            cors_origins,
            log_level,
            log_format,
            http_request_body_limit_bytes,
            http_concurrency_limit,
            http_request_timeout_secs,
            db_max_connections,
            db_acquire_timeout_secs,
            db_query_timeout_secs,
        })
    }

    /// The schema is migrated on start-up everywhere except production.
    pub fn runs_migrations(&self) -> bool {
        self.environment != Environment::Production
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_environment(raw: &str) -> Result<Environment> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "staging" => Ok(Environment::Staging),
        "production" => Ok(Environment::Production),
        other => Err(anyhow!(
            "APP_ENV must be development, staging or production, got '{other}'"
        )),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(anyhow!("LOG_FORMAT must be compact or json, got '{other}'")),
    }
}

fn parse_database_target<F>(lookup: &F) -> Result<DatabaseTarget>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_empty(lookup, "DATABASE_URL") {
        return Ok(DatabaseTarget::Url(url));
    }

    let (Some(host), Some(user), Some(name)) = (
        non_empty(lookup, "POSTGRES_HOST"),
        non_empty(lookup, "POSTGRES_USER"),
        non_empty(lookup, "POSTGRES_DB"),
    ) else {
        return Err(anyhow!(
            "DATABASE_URL or POSTGRES_HOST, POSTGRES_USER and POSTGRES_DB are required"
        ));
    };

    let port = non_empty(lookup, "POSTGRES_PORT")
        .unwrap_or_else(|| "5432".to_string())
        .parse::<u16>()
        .context("Failed to parse POSTGRES_PORT, expecting a port number")?;

    Ok(DatabaseTarget::Parts {
        host,
        port,
        user,
        password: lookup("POSTGRES_PASSWORD"),
        name,
    })
}

fn parse_cors_origins(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialEq + Default + ToString,
{
    let value = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|_| anyhow!("Failed to parse {key}, expecting positive integer"))?;

    if value == T::default() {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
