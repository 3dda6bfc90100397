/// Infrastructure Layer - Technical Implementations
///
/// Everything that touches sockets or HTTP: the peer transport and fan-out,
/// peer discovery, and the observability endpoints.
///
/// The infrastructure layer depends on the domain layer but the domain
/// layer does not depend on infrastructure (dependency inversion).
///
/// ## Modules
/// - `network`: framed TCP transport, peer server, fan-out channel
/// - `rendezvous`: topic based announce/lookup
/// - `observability`: metrics and health endpoints

pub mod network;
pub mod observability;
pub mod rendezvous;

// Re-export key types
pub use network::{
    Connection, NetworkTransport, PeerChannel, PeerServer, TcpPeerChannel, TokioTransport,
};
pub use rendezvous::{HttpRendezvous, InMemoryRendezvous, Rendezvous};
