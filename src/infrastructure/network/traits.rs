/// 网络核心trait定义
///
/// - `Connection` / `NetworkTransport`: framed byte transport, one frame per
///   JSON document
/// - `PeerChannel`: the fan-out used by submissions, independent of how
///   peers are found or reached

use crate::shared::protocol::{PeerRequest, PeerResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;

/// 网络连接trait
///
/// 表示一条已建立的帧连接
#[async_trait]
pub trait Connection: Send {
    /// 接收一帧，对端正常关闭时返回 `Ok(None)`
    async fn recv(&mut self) -> std::io::Result<Option<Bytes>>;

    /// 发送一帧
    async fn send(&mut self, frame: Bytes) -> std::io::Result<()>;

    /// 对端地址
    fn peer_addr(&self) -> std::io::Result<SocketAddr>;

    /// 本地地址
    fn local_addr(&self) -> std::io::Result<SocketAddr>;

    /// 连接ID，由接受方分配（主动连接为0）
    fn id(&self) -> u64;
}

/// 网络传输trait
///
/// 定义了网络后端的统一接口
#[async_trait]
pub trait NetworkTransport: Send {
    /// 绑定并监听地址
    async fn bind(&mut self, addr: SocketAddr) -> std::io::Result<()>;

    /// 接受新连接
    ///
    /// 阻塞直到有新连接到达
    async fn accept(&mut self) -> std::io::Result<Box<dyn Connection>>;

    /// 获取本地监听地址
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// Fan-out errors that prevent any peer from being contacted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("peer lookup failed: {0}")]
    Rendezvous(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        ChannelError::Io(err.to_string())
    }
}

/// Request/reply fan-out to all peers under a topic
#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Sends `request` to every peer and collects results in arrival order.
    ///
    /// Per-peer failures are entries in the returned list. `Err` is reserved
    /// for failures that reach no peer at all (e.g. the lookup itself).
    async fn map(
        &self,
        topic: &str,
        request: &PeerRequest,
        timeout: Duration,
    ) -> Result<Vec<PeerResult>, ChannelError>;
}
