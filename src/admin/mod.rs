//! Admin HTTP API.
//!
//! Every route sits behind bearer-token auth. Read routes return copies of
//! manager and monitor state; POST routes drive the admin operations.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::failover::FailoverManager;
use crate::health::HealthMonitor;

/// State shared by admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub manager: Arc<FailoverManager>,
    pub monitor: Arc<HealthMonitor>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(manager: Arc<FailoverManager>, monitor: Arc<HealthMonitor>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            manager,
            monitor,
            api_key: api_key.into(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/providers", get(get_providers))
        .route("/admin/health", get(get_health))
        .route("/admin/health/check", post(post_health_check))
        .route("/admin/health/{provider}/metrics", get(get_health_metrics))
        .route("/admin/health/{provider}/statistics", get(get_health_statistics))
        .route("/admin/failover/events", get(get_failover_events))
        .route("/admin/failover/statistics", get(get_failover_statistics))
        .route("/admin/failover/{provider}", post(post_manual_failover))
        .route("/admin/circuit-breakers/reset", post(post_reset_circuit_breakers))
        .route("/admin/recovery/check", post(post_recovery_check))
        .route("/admin/export/failover", get(export_failover))
        .route("/admin/export/health", get(export_health))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
