/// Network layer
///
/// - `traits`: `Connection`, `NetworkTransport`, `PeerChannel`
/// - `codec`: JSON body codec for one frame
/// - `backends`: Tokio TCP transport with length-delimited framing
/// - `server`: accept loop feeding the request dispatcher
/// - `client`: rendezvous-driven fan-out to peers

pub mod backends;
pub mod client;
pub mod codec;
pub mod server;
pub mod traits;

pub use backends::TokioTransport;
pub use client::TcpPeerChannel;
pub use codec::{Codec, CodecError, JsonCodec};
pub use server::PeerServer;
pub use traits::{ChannelError, Connection, NetworkTransport, PeerChannel};
