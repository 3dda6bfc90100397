/// Tokio网络后端实现
///
/// TCP streams framed with `LengthDelimitedCodec` (4-byte big-endian
/// length prefix).

use crate::infrastructure::network::codec::MAX_FRAME_LEN;
use crate::infrastructure::network::traits::{Connection, NetworkTransport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Opens a framed connection to a peer
pub async fn connect(addr: SocketAddr) -> std::io::Result<TokioConnection> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(TokioConnection::new(0, stream, addr))
}

/// Tokio TCP连接
pub struct TokioConnection {
    id: u64,
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    peer_addr: SocketAddr,
}

impl TokioConnection {
    fn new(id: u64, stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            framed: Framed::new(stream, frame_codec()),
            peer_addr,
        }
    }
}

#[async_trait]
impl Connection for TokioConnection {
    async fn recv(&mut self) -> std::io::Result<Option<Bytes>> {
        match self.framed.next().await {
            Some(frame) => Ok(Some(frame?.freeze())),
            None => Ok(None),
        }
    }

    async fn send(&mut self, frame: Bytes) -> std::io::Result<()> {
        self.framed.send(frame).await
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.peer_addr)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.framed.get_ref().local_addr()
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// Tokio TCP传输
pub struct TokioTransport {
    listener: Option<TcpListener>,
    next_conn_id: Arc<AtomicU64>,
}

impl TokioTransport {
    pub fn new() -> Self {
        Self {
            listener: None,
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for TokioTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn not_bound() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "Not bound")
}

#[async_trait]
impl NetworkTransport for TokioTransport {
    async fn bind(&mut self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.listener = Some(listener);
        Ok(())
    }

    async fn accept(&mut self) -> std::io::Result<Box<dyn Connection>> {
        let listener = self.listener.as_ref().ok_or_else(not_bound)?;

        let (stream, peer_addr) = listener.accept().await?;
        stream.set_nodelay(true)?;

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(TokioConnection::new(conn_id, stream, peer_addr)))
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.as_ref().ok_or_else(not_bound)?.local_addr()
    }
}
