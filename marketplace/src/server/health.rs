//! Readiness check for the marketplace.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use librix_web::handlers::{websocket::active_connections, HealthCheck, HealthReport};

/// Readiness check endpoint.
///
/// Reports the store, the lifecycle driver and open WebSocket connections.
/// Answers 503 only when a component is unhealthy.
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"status":"Healthy","checks":[{"component":"store","status":"Healthy"}, ...]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let services = &state.services;

    let store = match services.repos().jobs.pending().await {
        Ok(_) => HealthCheck::healthy("store"),
        Err(e) => HealthCheck::unhealthy("store", e.to_string()),
    };

    let lifecycle = if !services.driver_alive() {
        HealthCheck::unhealthy("lifecycle", "driver stopped")
    } else if !services.scheduler.is_accepting() {
        HealthCheck::degraded("lifecycle", "shutting down")
    } else {
        HealthCheck {
            message: Some(format!("{} timers pending", services.scheduler.pending_timers())),
            ..HealthCheck::healthy("lifecycle")
        }
    };

    let websocket = HealthCheck {
        message: Some(format!("{} connections", active_connections())),
        ..HealthCheck::healthy("websocket")
    };

    HealthReport::new(vec![store, lifecycle, websocket]).into_response_parts()
}
