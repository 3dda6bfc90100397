/// OrderBook Trait - Domain Layer Abstraction
///
/// The single-node matching engine contract. Every peer owns exactly one
/// implementation behind the matching service actor, which is what makes
/// `add_order` + `match_orders` atomic with respect to other submissions.
///
/// ## Operations
/// - `add_order`: insert a resting order, keeping price-time order
/// - `match_orders`: cross the book until no buy price reaches the best sell
/// - `get_orders`: copy out both sides
/// - `reset`: administrative clear (tests, operator console)
///
/// ## Example
/// ```rust
/// use p2p_exchange::domain::orderbook::{OrderBook, PriceTimeOrderBook};
/// use p2p_exchange::domain::entities::{Order, Side};
/// use rust_decimal::Decimal;
///
/// let mut book = PriceTimeOrderBook::new();
/// book.add_order(Order::new("b1", Side::Buy, Decimal::from(101), Decimal::from(2), 1));
/// book.add_order(Order::new("s1", Side::Sell, Decimal::from(100), Decimal::from(1), 2));
/// let trades = book.match_orders();
/// assert_eq!(trades.len(), 1);
/// ```

use crate::domain::entities::{BookSnapshot, Order, Trade};
use rust_decimal::Decimal;
use smallvec::SmallVec;

/// Trades produced by one `match_orders` call (0-8 is the common case)
pub type TradeBatch = SmallVec<[Trade; 8]>;

/// Core OrderBook trait
pub trait OrderBook: Send + 'static {
    /// Inserts an order on its side.
    ///
    /// Orders with an equal (price, timestamp) key keep arrival order.
    /// Identifiers are not checked for uniqueness.
    fn add_order(&mut self, order: Order);

    /// Matches the head buy against the head sell while they cross.
    ///
    /// # Matching Logic
    /// - executed quantity is `min(buy.quantity, sell.quantity)`
    /// - execution price is always the sell's price
    /// - an order whose quantity reaches zero leaves the book immediately
    ///
    /// Returns trades in execution order. With no cross present this is a
    /// no-op returning an empty batch.
    fn match_orders(&mut self) -> TradeBatch;

    /// Copies both sides out of the book
    fn get_orders(&self) -> BookSnapshot;

    /// Clears both sides
    fn reset(&mut self);

    /// Gets the best (highest) bid price
    fn best_bid(&self) -> Option<Decimal>;

    /// Gets the best (lowest) ask price
    fn best_ask(&self) -> Option<Decimal>;

    /// Number of resting (buy, sell) orders
    fn depth(&self) -> (usize, usize);

    /// Gets the current spread (best_ask - best_bid)
    ///
    /// Negative while a cross is pending, which only happens between
    /// `add_order` and `match_orders`.
    fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Gets the midpoint price ((best_bid + best_ask) / 2)
    fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Adds an order and matches as one step
    fn submit(&mut self, order: Order) -> TradeBatch {
        self.add_order(order);
        self.match_orders()
    }
}
