/// Network backend implementations
///
/// - tokio: Async TCP with the Tokio runtime

pub mod tokio;

// Re-export backend implementations
pub use tokio::{connect, TokioConnection, TokioTransport};
