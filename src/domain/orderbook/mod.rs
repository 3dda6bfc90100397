/// Domain Layer - OrderBook Module
///
/// Contains the single-instrument order book used by every peer.
///
/// ## Implementation
/// - `PriceTimeOrderBook`: two sorted `VecDeque`s (buys, sells) matched
///   head-against-head in price-time priority
///
/// ## Trait Abstraction
/// The `OrderBook` trait is what the matching service is generic over, so
/// the actor can be exercised with a mock book in tests.

pub mod price_time;
pub mod traits;

pub use price_time::PriceTimeOrderBook;
pub use traits::{OrderBook, TradeBatch};
