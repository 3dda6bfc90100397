//! Exchange node
//!
//! One peer of the exchange: an order book actor, a TCP server answering
//! other peers, an announcer keeping this node visible under the topic, and
//! the submission path that applies an order locally and broadcasts it.
//!
//! ```rust,no_run
//! use p2p_exchange::infrastructure::rendezvous::InMemoryRendezvous;
//! use p2p_exchange::node::{ExchangeNode, NodeConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rendezvous = Arc::new(InMemoryRendezvous::default());
//! let node = ExchangeNode::start(NodeConfig::default(), rendezvous).await?;
//! let submission = node.submit_order("buy", "100", "1").await?;
//! println!("{} replies", submission.replies.len());
//! node.close().await;
//! # Ok(())
//! # }
//! ```

use crate::application::services::{
    EngineError, EngineHandle, RequestDispatcher, SubmissionOrchestrator, SubmitError, Submission,
};
use crate::domain::entities::BookSnapshot;
use crate::domain::orderbook::PriceTimeOrderBook;
use crate::domain::validation::{OrderValidator, ValidationConfig};
use crate::infrastructure::network::{NetworkTransport, PeerServer, TcpPeerChannel, TokioTransport};
use crate::infrastructure::observability::{
    HealthChecker, HealthDetails, HealthStatus, ObservabilityServer,
};
use crate::infrastructure::rendezvous::{spawn_announcer, Rendezvous};
use crate::shared::protocol::{PeerRequest, PeerResult, DEFAULT_TOPIC};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the peer server binds; port 0 picks a free port
    pub listen_addr: SocketAddr,
    /// Topic announced and looked up
    pub topic: String,
    pub announce_interval: Duration,
    /// Deadline for one whole fan-out
    pub request_timeout: Duration,
    /// Bounded queue in front of the order book actor
    pub engine_capacity: usize,
    /// Serve `/metrics` and `/health*` here when set
    pub metrics_addr: Option<SocketAddr>,
    pub validation: ValidationConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            topic: DEFAULT_TOPIC.to_string(),
            announce_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(10_000),
            engine_capacity: 1024,
            metrics_addr: None,
            validation: ValidationConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Address other peers should dial; wildcard binds are announced as loopback
fn advertised_addr(local: SocketAddr) -> SocketAddr {
    if local.ip().is_unspecified() {
        let loopback = match local.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
        };
        SocketAddr::new(loopback, local.port())
    } else {
        local
    }
}

pub struct ExchangeNode {
    engine: EngineHandle,
    dispatcher: RequestDispatcher,
    orchestrator: SubmissionOrchestrator,
    local_addr: SocketAddr,
    health: Arc<HealthChecker>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ExchangeNode {
    /// Binds the peer server, starts announcing and returns a ready node
    pub async fn start(
        config: NodeConfig,
        rendezvous: Arc<dyn Rendezvous>,
    ) -> Result<Self, NodeError> {
        let health = Arc::new(HealthChecker::default());
        let shutdown = CancellationToken::new();
        let mut tasks = Vec::new();

        let engine = EngineHandle::spawn(PriceTimeOrderBook::new(), config.engine_capacity);
        let validator = OrderValidator::with_config(config.validation.clone());
        let dispatcher = RequestDispatcher::new(engine.clone(), validator.clone());

        let mut transport = TokioTransport::new();
        transport
            .bind(config.listen_addr)
            .await
            .map_err(|source| NodeError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        let local_addr = advertised_addr(transport.local_addr()?);

        let server = PeerServer::new(transport, dispatcher.clone(), shutdown.child_token());
        tasks.push(tokio::spawn(server.run()));

        health.set_details(HealthDetails {
            listen_addr: Some(local_addr.to_string()),
            topic: config.topic.clone(),
            active_connections: 0,
        });
        // 宣告失败时由 announcer 降级
        health.set_status(HealthStatus::Healthy);

        tasks.push(spawn_announcer(
            Arc::clone(&rendezvous),
            config.topic.clone(),
            local_addr,
            config.announce_interval,
            Arc::clone(&health),
            shutdown.child_token(),
        ));

        let channel = Arc::new(TcpPeerChannel::new(rendezvous).excluding(local_addr));
        let orchestrator = SubmissionOrchestrator::new(
            engine.clone(),
            channel,
            validator,
            config.topic.clone(),
            config.request_timeout,
        );

        if let Some(metrics_addr) = config.metrics_addr {
            let server = ObservabilityServer::new(metrics_addr, Arc::clone(&health));
            let token = shutdown.child_token();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = server.run(token).await {
                    error!("observability server failed: {}", e);
                }
            }));
        }

        info!(%local_addr, topic = %config.topic, "exchange node started");

        Ok(Self {
            engine,
            dispatcher,
            orchestrator,
            local_addr,
            health,
            shutdown,
            tasks,
        })
    }

    /// Applies a new order locally and broadcasts it to every peer
    pub async fn submit_order(
        &self,
        side: &str,
        price: &str,
        quantity: &str,
    ) -> Result<Submission, SubmitError> {
        self.orchestrator.submit(side, price, quantity).await
    }

    /// Snapshot of this node's book
    pub async fn order_book(&self) -> Result<BookSnapshot, EngineError> {
        self.engine.snapshot().await
    }

    /// Asks every peer for its book
    pub async fn peer_books(&self) -> Vec<PeerResult> {
        self.orchestrator.broadcast(&PeerRequest::GetOrders).await
    }

    pub async fn reset_order_book(&self) -> Result<(), EngineError> {
        self.engine.reset().await
    }

    /// The address announced to peers
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn topic(&self) -> &str {
        self.orchestrator.topic()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn health(&self) -> Arc<HealthChecker> {
        Arc::clone(&self.health)
    }

    /// Stops the server and announcer and waits for them
    ///
    /// The announcement stays visible to peers until its TTL runs out.
    pub async fn close(mut self) {
        self.health.set_status(HealthStatus::Unhealthy);
        self.shutdown.cancel();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
        info!(local_addr = %self.local_addr, "exchange node closed");
    }
}

impl Drop for ExchangeNode {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendezvous::InMemoryRendezvous;

    #[test]
    fn test_wildcard_bind_advertises_loopback() {
        let addr = advertised_addr("0.0.0.0:4000".parse().unwrap());
        assert_eq!(addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());

        let addr = advertised_addr("10.0.0.2:4000".parse().unwrap());
        assert_eq!(addr, "10.0.0.2:4000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_start_announces_and_closes() {
        let rendezvous = Arc::new(InMemoryRendezvous::default());
        let node = ExchangeNode::start(NodeConfig::default(), rendezvous.clone())
            .await
            .unwrap();

        assert_ne!(node.local_addr().port(), 0);
        assert!(node.health().check_readiness());

        // 首次宣告在启动后立即发生
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rendezvous.live(DEFAULT_TOPIC), vec![node.local_addr()]);

        let health = node.health();
        node.close().await;
        assert!(!health.check_liveness());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let rendezvous = Arc::new(InMemoryRendezvous::default());
        let first = ExchangeNode::start(NodeConfig::default(), rendezvous.clone())
            .await
            .unwrap();

        let config = NodeConfig {
            listen_addr: first.local_addr(),
            ..NodeConfig::default()
        };
        let err = ExchangeNode::start(config, rendezvous).await.err().unwrap();
        assert!(matches!(err, NodeError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_reset_order_book() {
        let rendezvous = Arc::new(InMemoryRendezvous::default());
        let node = ExchangeNode::start(NodeConfig::default(), rendezvous)
            .await
            .unwrap();

        node.submit_order("buy", "10", "1").await.unwrap();
        assert_eq!(node.order_book().await.unwrap().buys.len(), 1);

        node.reset_order_book().await.unwrap();
        assert!(node.order_book().await.unwrap().is_empty());
    }
}
