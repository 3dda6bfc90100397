/// Shared utilities and types used across all layers
///
/// This module contains:
/// - Peer protocol definitions (requests, replies, fan-out results)
/// - Order timestamps
/// - Prometheus metrics

pub mod metrics;
pub mod protocol;
pub mod timestamp;

// Re-export commonly used types
pub use protocol::{PeerReply, PeerRequest, PeerResult, ReplyStatus, DEFAULT_TOPIC};
pub use timestamp::{get_precise_timestamp, MonotonicClock};
