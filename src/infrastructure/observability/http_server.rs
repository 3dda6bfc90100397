//! HTTP Observability Server
//!
//! 提供Prometheus metrics和健康检查端点
//!
//! ## 端点
//! - `GET /metrics` - Prometheus格式的指标
//! - `GET /health` - 健康检查
//! - `GET /health/ready` - 就绪检查
//! - `GET /health/live` - 存活检查

use super::health::{HealthChecker, HealthStatus};
use crate::shared::metrics::METRICS;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 可观测性服务器
pub struct ObservabilityServer {
    addr: SocketAddr,
    health_checker: Arc<HealthChecker>,
}

impl ObservabilityServer {
    pub fn new(addr: SocketAddr, health_checker: Arc<HealthChecker>) -> Self {
        Self {
            addr,
            health_checker,
        }
    }

    pub fn health_checker(&self) -> Arc<HealthChecker> {
        self.health_checker.clone()
    }

    /// 路由（测试中直接驱动）
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/health/live", get(liveness_handler))
            .with_state(self.health_checker.clone())
    }

    /// 启动HTTP服务器，直到 `shutdown` 触发
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!("可观测性服务器启动于 {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

async fn metrics_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export(),
    )
        .into_response()
}

async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> Response {
    let mut response = checker.check_health();
    if let Some(details) = response.details.as_mut() {
        details.active_connections =
            METRICS.active_connections.with_label_values(&["inbound"]).get().max(0.0) as u64;
    }

    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Starting | HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response)).into_response()
}

async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> StatusCode {
    if checker.check_readiness() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> StatusCode {
    if checker.check_liveness() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
