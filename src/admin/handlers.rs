use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::failover::{FailoverEvent, FailoverExport, FailoverStatistics, ProviderSnapshot};
use crate::health::{HealthExport, HealthMetric, HealthStatistics, ProviderStatus};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminError::UnknownProvider(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub failover_enabled: bool,
    pub current_provider: String,
    pub monitor_running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailoverOutcome {
    pub success: bool,
    pub current_provider: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub recovered: bool,
    pub current_provider: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub since: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub window_ms: Option<u64>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        failover_enabled: state.manager.config().enabled,
        current_provider: state.manager.current_provider(),
        monitor_running: state.monitor.is_running(),
    })
}

pub async fn get_providers(State(state): State<AdminState>) -> Json<Vec<ProviderSnapshot>> {
    Json(state.manager.get_provider_states())
}

pub async fn get_health(State(state): State<AdminState>) -> Json<Vec<ProviderStatus>> {
    Json(state.monitor.get_provider_statuses())
}

pub async fn get_health_metrics(
    State(state): State<AdminState>,
    Path(provider): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<HealthMetric>>, AdminError> {
    if state.monitor.get_provider_status(&provider).is_none() {
        return Err(AdminError::UnknownProvider(provider));
    }
    Ok(Json(state.monitor.get_health_metrics(&provider, query.since)))
}

pub async fn get_health_statistics(
    State(state): State<AdminState>,
    Path(provider): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<HealthStatistics>, AdminError> {
    if state.monitor.get_provider_status(&provider).is_none() {
        return Err(AdminError::UnknownProvider(provider));
    }
    let window = query
        .window_ms
        .unwrap_or_else(|| state.monitor.config().statistics_window_ms);
    Ok(Json(state.monitor.get_health_statistics(&provider, window)))
}

pub async fn get_failover_events(State(state): State<AdminState>) -> Json<Vec<FailoverEvent>> {
    Json(state.manager.get_failover_events())
}

pub async fn get_failover_statistics(State(state): State<AdminState>) -> Json<FailoverStatistics> {
    Json(state.manager.get_failover_statistics())
}

pub async fn export_failover(State(state): State<AdminState>) -> Json<FailoverExport> {
    Json(state.manager.export_failover_data())
}

pub async fn export_health(State(state): State<AdminState>) -> Json<HealthExport> {
    Json(state.monitor.export_health_data())
}

pub async fn post_manual_failover(
    State(state): State<AdminState>,
    Path(provider): Path<String>,
) -> (StatusCode, Json<FailoverOutcome>) {
    let success = state.manager.manual_failover(&provider);
    let status = if success { StatusCode::OK } else { StatusCode::CONFLICT };
    tracing::info!(provider = %provider, success, "Manual failover requested via admin API");
    (
        status,
        Json(FailoverOutcome {
            success,
            current_provider: state.manager.current_provider(),
        }),
    )
}

pub async fn post_reset_circuit_breakers(State(state): State<AdminState>) -> Json<Vec<ProviderSnapshot>> {
    tracing::info!("Circuit breaker reset requested via admin API");
    state.manager.reset_circuit_breakers();
    Json(state.manager.get_provider_states())
}

pub async fn post_recovery_check(State(state): State<AdminState>) -> Json<RecoveryOutcome> {
    let recovered = state.manager.check_recovery_opportunities().await;
    Json(RecoveryOutcome {
        recovered,
        current_provider: state.manager.current_provider(),
    })
}

pub async fn post_health_check(State(state): State<AdminState>) -> Json<Vec<ProviderStatus>> {
    state.monitor.run_health_checks().await;
    Json(state.monitor.get_provider_statuses())
}
