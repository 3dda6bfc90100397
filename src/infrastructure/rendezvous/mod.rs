/// Rendezvous - topic based peer discovery
///
/// Peers announce their service address under a topic and look up everyone
/// else under the same topic. Entries expire unless re-announced, so a node
/// that stops announcing drops out of lookups after one TTL.
///
/// ## Implementations
/// - `InMemoryRendezvous`: shared table, for tests and single-process demos
/// - `HttpRendezvous`: client for the HTTP service in `http`
///
/// `announcer` runs the periodic announce loop each node keeps alive.

pub mod announcer;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use std::net::SocketAddr;

pub use announcer::spawn_announcer;
pub use http::{rendezvous_router, serve as serve_rendezvous, HttpRendezvous};
pub use memory::InMemoryRendezvous;

/// Default lifetime of an announcement
pub const DEFAULT_TTL_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("rendezvous unavailable: {0}")]
    Unavailable(String),

    #[error("rendezvous request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Rendezvous: Send + Sync {
    /// Registers (or refreshes) `addr` under `topic`
    async fn announce(&self, topic: &str, addr: SocketAddr) -> Result<(), RendezvousError>;

    /// All live addresses under `topic`, possibly empty
    async fn lookup(&self, topic: &str) -> Result<Vec<SocketAddr>, RendezvousError>;
}
