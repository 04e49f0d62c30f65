use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::health_service::{CheckResult, HealthReport, HealthStatus};
use crate::presentation::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CheckDto {
    pub(crate) name: String,
    pub(crate) status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct HealthResponseDto {
    pub(crate) status: String,
    pub(crate) checks: Vec<CheckDto>,
}

fn status_label(status: HealthStatus) -> String {
    match status {
        HealthStatus::Up => "up".to_string(),
        HealthStatus::Down => "down".to_string(),
    }
}

impl From<CheckResult> for CheckDto {
    fn from(check: CheckResult) -> Self {
        Self {
            name: check.name.to_string(),
            status: status_label(check.status),
            error: check.error,
        }
    }
}

impl From<HealthReport> for HealthResponseDto {
    fn from(report: HealthReport) -> Self {
        Self {
            status: status_label(report.status),
            checks: report.checks.into_iter().map(CheckDto::from).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthResponseDto),
        (status = 503, description = "A dependency is down", body = HealthResponseDto)
    )
)]
pub(crate) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponseDto>) {
    let report = state.health_service.check().await;
    let status = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(HealthResponseDto::from(report)))
}
