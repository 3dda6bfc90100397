/// Price-time priority order book
///
/// Two sorted queues of resting orders:
/// - `buys`: price descending, then timestamp ascending
/// - `sells`: price ascending, then timestamp ascending
///
/// Insertion uses a binary search for the first slot whose key sorts after
/// the new order, which keeps both queues sorted without a full re-sort and
/// places equal keys in arrival order. Matching only ever touches the two
/// heads, so `VecDeque::pop_front` keeps removal O(1).

use super::traits::{OrderBook, TradeBatch};
use crate::domain::entities::{BookSnapshot, Order, Side, Trade};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct PriceTimeOrderBook {
    buys: VecDeque<Order>,
    sells: VecDeque<Order>,
}

/// Priority of `a` relative to `b` on the buy side (Less = matched first)
#[inline]
fn buy_priority(a: &Order, b: &Order) -> Ordering {
    b.price.cmp(&a.price).then(a.timestamp.cmp(&b.timestamp))
}

/// Priority of `a` relative to `b` on the sell side (Less = matched first)
#[inline]
fn sell_priority(a: &Order, b: &Order) -> Ordering {
    a.price.cmp(&b.price).then(a.timestamp.cmp(&b.timestamp))
}

impl PriceTimeOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resting buy orders, best first
    pub fn buys(&self) -> impl Iterator<Item = &Order> {
        self.buys.iter()
    }

    /// Resting sell orders, best first
    pub fn sells(&self) -> impl Iterator<Item = &Order> {
        self.sells.iter()
    }

    fn insert_sorted(
        queue: &mut VecDeque<Order>,
        order: Order,
        priority: fn(&Order, &Order) -> Ordering,
    ) {
        // 相同价格和时间戳的订单排在已有订单之后
        let idx = queue.partition_point(|resting| priority(resting, &order) != Ordering::Greater);
        queue.insert(idx, order);
    }

    #[inline]
    fn crossed(&self) -> bool {
        match (self.buys.front(), self.sells.front()) {
            (Some(buy), Some(sell)) => buy.price >= sell.price,
            _ => false,
        }
    }
}

impl OrderBook for PriceTimeOrderBook {
    fn add_order(&mut self, order: Order) {
        match order.side {
            Side::Buy => Self::insert_sorted(&mut self.buys, order, buy_priority),
            Side::Sell => Self::insert_sorted(&mut self.sells, order, sell_priority),
        }
    }

    fn match_orders(&mut self) -> TradeBatch {
        let mut trades: TradeBatch = SmallVec::new();

        while self.crossed() {
            let (Some(buy), Some(sell)) = (self.buys.front_mut(), self.sells.front_mut()) else {
                break;
            };

            let quantity = buy.quantity.min(sell.quantity);
            trades.push(Trade {
                price: sell.price,
                quantity,
                buy_order_id: buy.id.clone(),
                sell_order_id: sell.id.clone(),
            });

            buy.quantity -= quantity;
            sell.quantity -= quantity;

            let buy_filled = buy.is_filled();
            let sell_filled = sell.is_filled();
            if buy_filled {
                self.buys.pop_front();
            }
            if sell_filled {
                self.sells.pop_front();
            }
        }

        trades
    }

    fn get_orders(&self) -> BookSnapshot {
        BookSnapshot {
            buys: self.buys.iter().cloned().collect(),
            sells: self.sells.iter().cloned().collect(),
        }
    }

    fn reset(&mut self) {
        self.buys.clear();
        self.sells.clear();
    }

    fn best_bid(&self) -> Option<Decimal> {
        self.buys.front().map(|o| o.price)
    }

    fn best_ask(&self) -> Option<Decimal> {
        self.sells.front().map(|o| o.price)
    }

    fn depth(&self) -> (usize, usize) {
        (self.buys.len(), self.sells.len())
    }
}
