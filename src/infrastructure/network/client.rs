/// TCP fan-out channel
///
/// Looks peers up through a `Rendezvous`, opens one connection per peer,
/// sends the same request frame to all of them concurrently and collects
/// replies as they arrive. The lookup and every reply share one deadline.

use super::backends::tokio::connect;
use super::codec::{Codec, JsonCodec};
use super::traits::{ChannelError, Connection, PeerChannel};
use crate::infrastructure::rendezvous::Rendezvous;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{PeerReply, PeerRequest, PeerResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub struct TcpPeerChannel {
    rendezvous: Arc<dyn Rendezvous>,
    /// This node's own announced address, never contacted
    exclude: Option<SocketAddr>,
}

impl TcpPeerChannel {
    pub fn new(rendezvous: Arc<dyn Rendezvous>) -> Self {
        Self {
            rendezvous,
            exclude: None,
        }
    }

    pub fn excluding(mut self, addr: SocketAddr) -> Self {
        self.exclude = Some(addr);
        self
    }

    async fn lookup(&self, topic: &str) -> Result<Vec<SocketAddr>, ChannelError> {
        let mut peers = self
            .rendezvous
            .lookup(topic)
            .await
            .map_err(|e| ChannelError::Rendezvous(e.to_string()))?;
        peers.sort_unstable();
        peers.dedup();
        peers.retain(|peer| Some(*peer) != self.exclude);
        Ok(peers)
    }
}

/// One request/reply exchange on a fresh connection
async fn request_one(peer: SocketAddr, frame: Bytes) -> Result<PeerReply, ChannelError> {
    let mut conn = connect(peer).await?;
    conn.send(frame).await?;
    let reply = conn
        .recv()
        .await?
        .ok_or_else(|| ChannelError::Io("connection closed before reply".to_string()))?;
    JsonCodec::<PeerReply>::new()
        .decode(&reply)
        .map_err(|e| ChannelError::Codec(e.to_string()))
}

#[async_trait]
impl PeerChannel for TcpPeerChannel {
    async fn map(
        &self,
        topic: &str,
        request: &PeerRequest,
        timeout: Duration,
    ) -> Result<Vec<PeerResult>, ChannelError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let _timer = METRICS
            .fanout_duration
            .with_label_values(&[request.kind()])
            .start_timer();

        let peers = tokio::time::timeout_at(deadline, self.lookup(topic))
            .await
            .map_err(|_| ChannelError::Timeout(timeout))??;
        if peers.is_empty() {
            debug!(topic, "no peers to contact");
            return Ok(Vec::new());
        }

        let frame = JsonCodec::<PeerRequest>::new()
            .encode(request)
            .map_err(|e| ChannelError::Codec(e.to_string()))?;

        let mut pending: FuturesUnordered<_> = peers
            .iter()
            .map(|&peer| {
                let frame = frame.clone();
                async move { (peer, request_one(peer, frame).await) }
            })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((_, Ok(reply))) => {
                        METRICS.fanout_results_total.with_label_values(&["reply"]).inc();
                        results.push(PeerResult::Reply(reply));
                    }
                    Some((peer, Err(e))) => {
                        debug!(%peer, "peer request failed: {}", e);
                        METRICS.fanout_results_total.with_label_values(&["error"]).inc();
                        results.push(PeerResult::error(format!("{}: {}", peer, e)));
                    }
                    None => break,
                },
                _ = &mut sleep => {
                    let outstanding = pending.len();
                    METRICS
                        .fanout_results_total
                        .with_label_values(&["timeout"])
                        .inc_by(outstanding as f64);
                    results.push(PeerResult::error(format!(
                        "timed out after {:?} waiting for {} peer(s)",
                        timeout, outstanding
                    )));
                    break;
                }
            }
        }

        debug!(
            topic,
            kind = request.kind(),
            peers = peers.len(),
            results = results.len(),
            elapsed = ?started.elapsed(),
            "fan-out complete"
        );
        Ok(results)
    }
}
