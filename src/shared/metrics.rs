//! Prometheus Metrics Module
//!
//! 交易节点的核心指标
//!
//! ## 指标类型
//! - **Counter**: 提交订单数、成交数、对端请求数、广播结果
//! - **Histogram**: 广播耗时
//! - **Gauge**: 订单簿深度、已连接对端数
//!
//! ## 使用示例
//! ```rust,ignore
//! use p2p_exchange::shared::metrics::METRICS;
//!
//! METRICS.orders_total.with_label_values(&["buy", "local"]).inc();
//!
//! let timer = METRICS.fanout_duration.with_label_values(&["order"]).start_timer();
//! // ... 广播 ...
//! timer.observe_duration();
//! ```

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec,
    CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

lazy_static! {
    /// 全局Metrics实例
    pub static ref METRICS: Metrics = Metrics::new();
}

/// 节点指标
pub struct Metrics {
    /// 进入订单簿的订单数 (side, origin: local/remote)
    pub orders_total: CounterVec,

    /// 成交数 (origin)
    pub trades_total: CounterVec,

    /// 收到的对端请求 (kind)
    pub peer_requests_total: CounterVec,

    /// 广播中每个对端的结果 (outcome: reply/error/timeout)
    pub fanout_results_total: CounterVec,

    /// 广播耗时 (秒)
    pub fanout_duration: HistogramVec,

    /// 订单簿深度 (side)
    pub orderbook_depth: GaugeVec,

    /// 买卖价差，任一侧为空时为 NaN
    pub orderbook_spread: Gauge,

    /// 当前连接数
    pub active_connections: GaugeVec,

    /// 错误总数 (按类型)
    pub errors_total: CounterVec,
}

impl Metrics {
    /// 创建新的Metrics实例
    ///
    /// Registers against the default registry, so only the `METRICS` static
    /// should call this.
    pub fn new() -> Self {
        Self {
            orders_total: register_counter_vec!(
                "p2p_exchange_orders_total",
                "Total number of orders applied to the local book",
                &["side", "origin"]
            )
            .expect("register p2p_exchange_orders_total"),

            trades_total: register_counter_vec!(
                "p2p_exchange_trades_total",
                "Total number of trades produced by the local book",
                &["origin"]
            )
            .expect("register p2p_exchange_trades_total"),

            peer_requests_total: register_counter_vec!(
                "p2p_exchange_peer_requests_total",
                "Total number of requests received from peers",
                &["kind"]
            )
            .expect("register p2p_exchange_peer_requests_total"),

            fanout_results_total: register_counter_vec!(
                "p2p_exchange_fanout_results_total",
                "Per-peer outcomes of outgoing requests",
                &["outcome"]
            )
            .expect("register p2p_exchange_fanout_results_total"),

            fanout_duration: register_histogram_vec!(
                "p2p_exchange_fanout_duration_seconds",
                "Time from lookup to last reply of a fan-out",
                &["kind"],
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
            )
            .expect("register p2p_exchange_fanout_duration_seconds"),

            orderbook_depth: register_gauge_vec!(
                "p2p_exchange_orderbook_depth",
                "Resting orders in the local book",
                &["side"]
            )
            .expect("register p2p_exchange_orderbook_depth"),

            orderbook_spread: register_gauge!(
                "p2p_exchange_orderbook_spread",
                "Best ask minus best bid in the local book"
            )
            .expect("register p2p_exchange_orderbook_spread"),

            active_connections: register_gauge_vec!(
                "p2p_exchange_active_connections",
                "Number of open peer connections",
                &["direction"]
            )
            .expect("register p2p_exchange_active_connections"),

            errors_total: register_counter_vec!(
                "p2p_exchange_errors_total",
                "Total number of errors",
                &["error_type"]
            )
            .expect("register p2p_exchange_errors_total"),
        }
    }

    /// Updates both depth gauges from a `(buys, sells)` pair
    pub fn set_depth(&self, (buys, sells): (usize, usize)) {
        self.orderbook_depth.with_label_values(&["buy"]).set(buys as f64);
        self.orderbook_depth.with_label_values(&["sell"]).set(sells as f64);
    }

    pub fn set_spread(&self, spread: Option<Decimal>) {
        let value = spread.and_then(|s| s.to_f64()).unwrap_or(f64::NAN);
        self.orderbook_spread.set(value);
    }

    /// 导出Prometheus格式的指标
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
