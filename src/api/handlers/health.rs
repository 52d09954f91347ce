//! 健康检查处理器

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequestId;
use crate::api::server::AppState;
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("ok"))
}

/// `GET /health/live`：进程存活即返回
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse::new("alive"))
}

/// `GET /health/ready`：数据库不可用时返回 503
pub async fn readiness(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ready"))),
        Err(e) => {
            lwarn!(
                request_id,
                LogStage::Db,
                LogComponent::Database,
                "readiness_failed",
                "数据库不可用",
                error = %e
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("unavailable")),
            )
        }
    }
}
