//! Property tests for the price-time order book

use p2p_exchange::domain::entities::{Order, Side};
use p2p_exchange::domain::orderbook::{OrderBook, PriceTimeOrderBook};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn arb_order() -> impl Strategy<Value = Order> {
    (any::<bool>(), 90u32..110, 1u32..20, 0u64..50).prop_map(|(buy, price, qty, ts)| {
        Order::new(
            format!("{}-{}-{}", price, qty, ts),
            if buy { Side::Buy } else { Side::Sell },
            Decimal::from(price),
            Decimal::from(qty),
            ts,
        )
    })
}

fn buys_sorted(book: &PriceTimeOrderBook) -> bool {
    let buys: Vec<_> = book.buys().collect();
    buys.windows(2).all(|w| {
        w[0].price > w[1].price || (w[0].price == w[1].price && w[0].timestamp <= w[1].timestamp)
    })
}

fn sells_sorted(book: &PriceTimeOrderBook) -> bool {
    let sells: Vec<_> = book.sells().collect();
    sells.windows(2).all(|w| {
        w[0].price < w[1].price || (w[0].price == w[1].price && w[0].timestamp <= w[1].timestamp)
    })
}

fn total(orders: impl Iterator<Item = Decimal>) -> Decimal {
    orders.fold(Decimal::ZERO, |acc, q| acc + q)
}

proptest! {
    #[test]
    fn sides_stay_sorted_after_every_add(orders in prop::collection::vec(arb_order(), 0..60)) {
        let mut book = PriceTimeOrderBook::new();
        for order in orders {
            book.add_order(order);
            prop_assert!(buys_sorted(&book));
            prop_assert!(sells_sorted(&book));
        }
    }

    #[test]
    fn matching_terminates_uncrossed(orders in prop::collection::vec(arb_order(), 0..60)) {
        let mut book = PriceTimeOrderBook::new();
        for order in orders {
            book.submit(order);
            match (book.best_bid(), book.best_ask()) {
                (Some(bid), Some(ask)) => prop_assert!(bid < ask),
                _ => {}
            }
            prop_assert!(book.buys().chain(book.sells()).all(|o| o.quantity > Decimal::ZERO));
        }
    }

    #[test]
    fn quantity_is_conserved(orders in prop::collection::vec(arb_order(), 0..60)) {
        let mut book = PriceTimeOrderBook::new();
        let mut submitted_buys = Decimal::ZERO;
        let mut submitted_sells = Decimal::ZERO;
        let mut traded = Decimal::ZERO;

        for order in orders {
            match order.side {
                Side::Buy => submitted_buys += order.quantity,
                Side::Sell => submitted_sells += order.quantity,
            }
            for trade in book.submit(order) {
                prop_assert!(trade.quantity > Decimal::ZERO);
                traded += trade.quantity;
            }
        }

        prop_assert_eq!(submitted_buys, total(book.buys().map(|o| o.quantity)) + traded);
        prop_assert_eq!(submitted_sells, total(book.sells().map(|o| o.quantity)) + traded);
    }

    #[test]
    fn match_orders_is_idempotent(orders in prop::collection::vec(arb_order(), 0..40)) {
        let mut book = PriceTimeOrderBook::new();
        for order in orders {
            book.add_order(order);
        }
        book.match_orders();
        let before = book.get_orders();
        prop_assert!(book.match_orders().is_empty());
        prop_assert_eq!(book.get_orders(), before);
    }
}
