/// Domain Layer - Core Business Logic
///
/// Pure matching logic with no I/O: entities, the order book and the
/// validation rules applied before an order may rest in a book.
///
/// ## Modules
/// - `entities`: Order, Trade, Side, BookSnapshot
/// - `orderbook`: the price-time priority book and its trait
/// - `validation`: submission parsing and order checks

pub mod entities;
pub mod orderbook;
pub mod validation;

// Re-export key types
pub use entities::{BookSnapshot, Order, Side, Trade};
pub use orderbook::{OrderBook, PriceTimeOrderBook};
pub use validation::{OrderValidator, ValidationError};
