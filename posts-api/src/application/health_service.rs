use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::error::DomainError;

#[async_trait]
pub(crate) trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub(crate) struct CheckResult {
    pub(crate) name: &'static str,
    pub(crate) status: HealthStatus,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct HealthReport {
    pub(crate) status: HealthStatus,
    pub(crate) checks: Vec<CheckResult>,
}

pub(crate) struct HealthService {
    database: Arc<dyn DatabaseProbe>,
    check_timeout: Duration,
}

impl HealthService {
    pub(crate) const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

    pub(crate) fn new(database: Arc<dyn DatabaseProbe>, check_timeout: Duration) -> Self {
        Self {
            database,
            check_timeout,
        }
    }

    pub(crate) async fn check(&self) -> HealthReport {
        let database = match tokio::time::timeout(self.check_timeout, self.database.ping()).await
        {
            Ok(Ok(())) => CheckResult {
                name: "database",
                status: HealthStatus::Up,
                error: None,
            },
            Ok(Err(err)) => down("database", err.to_string()),
            Err(_) => down("database", "check timed out".to_string()),
        };

        let status = if database.status == HealthStatus::Up {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };

        HealthReport {
            status,
            checks: vec![database],
        }
    }
}

fn down(name: &'static str, error: String) -> CheckResult {
    warn!(check = name, %error, "health check failed");
    CheckResult {
        name,
        status: HealthStatus::Down,
        error: Some(error),
    }
}
