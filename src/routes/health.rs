use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::InfraState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub redis: bool,
}

/// 存活探测端点，供运维健康检查消费
pub async fn health_check(
    State(state): State<InfraState>,
) -> (StatusCode, Json<HealthResponse>) {
    let redis = state.connection.is_healthy().await;
    let (status_code, status) = if redis {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (status_code, Json(HealthResponse { status, redis }))
}
