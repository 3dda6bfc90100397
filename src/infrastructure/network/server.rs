/// Peer server - accept loop and per-connection request handling
///
/// Each accepted connection gets its own task. A connection may carry any
/// number of sequential requests; every request frame is answered with
/// exactly one reply frame.

use super::codec::{Codec, CodecError, JsonCodec};
use super::traits::{Connection, NetworkTransport};
use crate::application::services::RequestDispatcher;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::PeerReply;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct PeerServer<T: NetworkTransport> {
    transport: T,
    dispatcher: RequestDispatcher,
    shutdown: CancellationToken,
}

impl<T: NetworkTransport> PeerServer<T> {
    /// Wraps an already bound transport
    pub fn new(transport: T, dispatcher: RequestDispatcher, shutdown: CancellationToken) -> Self {
        Self {
            transport,
            dispatcher,
            shutdown,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// 接受连接直到取消
    pub async fn run(mut self) {
        let addr = self.transport.local_addr().ok();
        info!(?addr, "peer server listening");

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.transport.accept() => accepted,
            };

            match accepted {
                Ok(conn) => {
                    let dispatcher = self.dispatcher.clone();
                    let shutdown = self.shutdown.clone();
                    tokio::spawn(async move {
                        handle_connection(conn, dispatcher, shutdown).await;
                    });
                }
                Err(e) => {
                    // 单次 accept 失败不终止服务
                    warn!("accept failed: {}", e);
                    METRICS.errors_total.with_label_values(&["accept"]).inc();
                }
            }
        }

        info!(?addr, "peer server stopped");
    }
}

async fn handle_connection(
    mut conn: Box<dyn Connection>,
    dispatcher: RequestDispatcher,
    shutdown: CancellationToken,
) {
    let peer = conn.peer_addr().ok();
    let conn_id = conn.id();
    debug!(conn_id, ?peer, "peer connected");
    let gauge = METRICS.active_connections.with_label_values(&["inbound"]);
    gauge.inc();

    let codec = JsonCodec::<PeerReply>::new();
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = conn.recv() => frame,
        };

        let frame = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                debug!(conn_id, ?peer, "connection error: {}", e);
                break;
            }
        };

        let reply = dispatcher.dispatch(&frame).await;
        let encoded = match encode_reply(&codec, &reply) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(conn_id, "failed to encode reply: {}", e);
                METRICS.errors_total.with_label_values(&["encode"]).inc();
                break;
            }
        };
        if let Err(e) = conn.send(encoded).await {
            debug!(conn_id, ?peer, "failed to send reply: {}", e);
            break;
        }
    }

    gauge.dec();
    debug!(conn_id, ?peer, "peer disconnected");
}

/// Encodes a reply, substituting a status reply when it exceeds the frame limit
fn encode_reply(codec: &JsonCodec<PeerReply>, reply: &PeerReply) -> Result<Bytes, CodecError> {
    match codec.encode(reply) {
        Err(CodecError::FrameTooLarge { len, max }) => {
            warn!(len, max, "reply exceeds frame limit");
            METRICS.errors_total.with_label_values(&["reply_too_large"]).inc();
            codec.encode(&PeerReply::reply_too_large())
        }
        encoded => encoded,
    }
}
