//! Health Check
//!
//! 节点健康状态，供负载均衡器和监控系统使用
//!
//! ## 健康检查端点
//! - `/health` - 状态与详细信息
//! - `/health/ready` - 就绪检查（节点已监听并已宣告地址）
//! - `/health/live` - 存活检查（进程仍在运行）
//!
//! ## 响应格式
//! ```json
//! {
//!   "status": "healthy",
//!   "uptime_seconds": 3600,
//!   "version": "0.1.0",
//!   "timestamp": 1234567890
//! }
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 启动中（尚未监听）
    Starting,
    /// 健康
    Healthy,
    /// 降级（例如无法宣告地址）
    Degraded,
    /// 不健康（关闭中）
    Unhealthy,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// 详细健康信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    /// 节点对外服务地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_addr: Option<String>,
    /// 宣告使用的主题
    pub topic: String,
    /// 当前入站连接数
    pub active_connections: u64,
}

/// 健康检查器
#[derive(Debug)]
pub struct HealthChecker {
    start_time: SystemTime,
    status: Arc<RwLock<HealthStatus>>,
    details: RwLock<Option<HealthDetails>>,
    version: String,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            start_time: SystemTime::now(),
            status: Arc::new(RwLock::new(HealthStatus::Starting)),
            details: RwLock::new(None),
            version: version.into(),
        }
    }

    /// 获取运行时间（秒）
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time
            .elapsed()
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn set_status(&self, status: HealthStatus) {
        *self.status.write() = status;
    }

    pub fn get_status(&self) -> HealthStatus {
        *self.status.read()
    }

    /// Healthy -> Degraded; other states are left alone
    pub fn mark_degraded(&self) {
        let mut status = self.status.write();
        if *status == HealthStatus::Healthy {
            *status = HealthStatus::Degraded;
        }
    }

    /// Degraded -> Healthy; other states are left alone
    pub fn mark_recovered(&self) {
        let mut status = self.status.write();
        if *status == HealthStatus::Degraded {
            *status = HealthStatus::Healthy;
        }
    }

    /// 设置 `/health` 附带的详细信息
    pub fn set_details(&self, details: HealthDetails) {
        *self.details.write() = Some(details);
    }

    pub fn check_health(&self) -> HealthResponse {
        HealthResponse {
            status: self.get_status(),
            uptime_seconds: self.uptime_seconds(),
            version: self.version.clone(),
            timestamp: Self::current_timestamp(),
            details: self.details.read().clone(),
        }
    }

    /// 存活检查（liveness probe）
    pub fn check_liveness(&self) -> bool {
        !matches!(self.get_status(), HealthStatus::Unhealthy)
    }

    /// 就绪检查（readiness probe）
    pub fn check_readiness(&self) -> bool {
        matches!(self.get_status(), HealthStatus::Healthy)
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_checker_starts_not_ready() {
        let checker = HealthChecker::new("1.0.0");
        assert_eq!(checker.get_status(), HealthStatus::Starting);
        assert!(checker.check_liveness());
        assert!(!checker.check_readiness());
    }

    #[test]
    fn test_readiness_probe() {
        let checker = HealthChecker::new("1.0.0");

        checker.set_status(HealthStatus::Healthy);
        assert!(checker.check_readiness());

        checker.set_status(HealthStatus::Degraded);
        assert!(!checker.check_readiness());
        assert!(checker.check_liveness());

        checker.set_status(HealthStatus::Unhealthy);
        assert!(!checker.check_readiness());
        assert!(!checker.check_liveness());
    }

    #[test]
    fn test_degrade_and_recover_only_from_serving_states() {
        let checker = HealthChecker::new("1.0.0");

        // 启动阶段不受影响
        checker.mark_degraded();
        assert_eq!(checker.get_status(), HealthStatus::Starting);

        checker.set_status(HealthStatus::Healthy);
        checker.mark_degraded();
        assert_eq!(checker.get_status(), HealthStatus::Degraded);
        checker.mark_recovered();
        assert_eq!(checker.get_status(), HealthStatus::Healthy);

        checker.set_status(HealthStatus::Unhealthy);
        checker.mark_recovered();
        assert_eq!(checker.get_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_response_with_details() {
        let checker = HealthChecker::new("1.0.0");
        assert!(checker.check_health().details.is_none());

        checker.set_details(HealthDetails {
            listen_addr: Some("127.0.0.1:4000".into()),
            topic: "exchange_orders".into(),
            active_connections: 2,
        });
        let response = checker.check_health();
        assert_eq!(response.version, "1.0.0");
        assert!(response.timestamp > 0);
        assert_eq!(response.details.unwrap().topic, "exchange_orders");
    }

    #[test]
    fn test_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            uptime_seconds: 3600,
            version: "1.0.0".to_string(),
            timestamp: 1234567890,
            details: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("3600"));
        assert!(!json.contains("details"));
    }
}
