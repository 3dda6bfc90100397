/// Domain Entities - Orders, Trades and Book Snapshots
///
/// These are the values the order book owns and emits. They are also the
/// payloads that travel between peers, so their serde shape is the wire
/// shape (`buyOrderId`, `sellOrderId`, lowercase sides).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a side string is neither `buy` nor `sell`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order side: {0:?}")]
pub struct ParseSideError(pub String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(ParseSideError(other.to_string())),
        }
    }
}

/// A limit order resting in (or about to enter) a peer's book.
///
/// `quantity` is the remaining quantity and shrinks as the order fills.
/// `timestamp` is milliseconds since the Unix epoch from the submitter's clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: u64,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        timestamp: u64,
    ) -> Self {
        Self {
            id: id.into(),
            side,
            price,
            quantity,
            timestamp,
        }
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// An execution between the head buy and the head sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub price: Decimal,
    pub quantity: Decimal,
    pub buy_order_id: String,
    pub sell_order_id: String,
}

/// Copy of both sides of a book, best price first on each side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub buys: Vec<Order>,
    pub sells: Vec<Order>,
}

impl BookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.buys.first().map(|o| o.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.sells.first().map(|o| o.price)
    }

    /// best_ask - best_bid, when both sides rest
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        Some((self.best_bid()? + self.best_ask()?) / Decimal::TWO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_parse() {
        assert_eq!("buy".parse::<Side>(), Ok(Side::Buy));
        assert_eq!("sell".parse::<Side>(), Ok(Side::Sell));
        assert!("BUY".parse::<Side>().is_err());
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn test_trade_wire_field_names() {
        let trade = Trade {
            price: dec!(100),
            quantity: dec!(1),
            buy_order_id: "b1".to_string(),
            sell_order_id: "s1".to_string(),
        };
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["buyOrderId"], "b1");
        assert_eq!(json["sellOrderId"], "s1");
    }

    #[test]
    fn test_order_accepts_numeric_json() {
        // 对端可能以 JSON 数字发送价格
        let order: Order = serde_json::from_str(
            r#"{"id":"x","side":"sell","price":100.5,"quantity":2,"timestamp":7}"#,
        )
        .unwrap();
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, dec!(100.5));
        assert_eq!(order.quantity, dec!(2));
    }

    #[test]
    fn test_order_rejects_unknown_side() {
        let result = serde_json::from_str::<Order>(
            r#"{"id":"x","side":"hold","price":"1","quantity":"1","timestamp":7}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_quote() {
        let mut book = BookSnapshot::default();
        book.buys.push(Order::new("b", Side::Buy, dec!(99), dec!(1), 1));
        assert_eq!(book.best_bid(), Some(dec!(99)));
        assert_eq!(book.spread(), None);
        assert_eq!(book.mid_price(), None);

        book.sells.push(Order::new("s", Side::Sell, dec!(100.5), dec!(1), 2));
        assert_eq!(book.spread(), Some(dec!(1.5)));
        assert_eq!(book.mid_price(), Some(dec!(99.75)));
    }
}
