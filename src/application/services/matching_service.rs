/// Matching Service - Single-owner Order Book Actor
///
/// The node's order book is owned by exactly one task. Local submissions,
/// orders arriving from peers, snapshot requests and resets are all
/// serialized through one bounded MPSC channel, so `add_order` followed by
/// `match_orders` is atomic with respect to every other operation.
///
/// ## Architecture
/// - `MatchingService<OB>` runs the receive loop and owns the book
/// - `EngineHandle` is the cloneable sender side; every call carries a
///   oneshot for its reply
/// - **Generic over OrderBook implementation** so the loop can be driven
///   with a mock book in tests
///
/// ## Usage
/// ```rust
/// use p2p_exchange::application::services::EngineHandle;
/// use p2p_exchange::domain::entities::{Order, Side};
/// use p2p_exchange::domain::orderbook::PriceTimeOrderBook;
/// use rust_decimal::Decimal;
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = EngineHandle::spawn(PriceTimeOrderBook::new(), 64);
/// let order = Order::new("b1", Side::Buy, Decimal::from(100), Decimal::from(1), 1);
/// let trades = engine.submit(order, "local").await.unwrap();
/// assert!(trades.is_empty());
/// assert_eq!(engine.snapshot().await.unwrap().buys.len(), 1);
/// # }
/// ```

use crate::domain::entities::{BookSnapshot, Order, Trade};
use crate::domain::orderbook::OrderBook;
use crate::shared::metrics::METRICS;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Commands that the matching engine can receive
#[derive(Debug)]
pub enum EngineCommand {
    /// Add an order and match. `origin` is `local` or `remote`, for metrics.
    Submit {
        order: Order,
        origin: &'static str,
        respond_to: oneshot::Sender<Vec<Trade>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<BookSnapshot>,
    },
    Reset {
        respond_to: oneshot::Sender<()>,
    },
}

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The service task has stopped and no longer accepts commands
    #[error("matching engine is not running")]
    Closed,
}

/// Single-owner matching service
///
/// # Type Parameters
/// * `OB` - OrderBook implementation (must implement `OrderBook` trait)
pub struct MatchingService<OB: OrderBook> {
    orderbook: OB,
    command_receiver: mpsc::Receiver<EngineCommand>,
}

impl<OB: OrderBook> MatchingService<OB> {
    pub fn new(orderbook: OB, command_receiver: mpsc::Receiver<EngineCommand>) -> Self {
        MatchingService {
            orderbook,
            command_receiver,
        }
    }

    /// Runs the main event loop until every `EngineHandle` is dropped
    pub async fn run(mut self) {
        debug!("撮合引擎启动");
        while let Some(command) = self.command_receiver.recv().await {
            self.process(command);
        }
        info!(depth = ?self.orderbook.depth(), "撮合引擎关闭");
    }

    #[inline]
    fn process(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Submit {
                order,
                origin,
                respond_to,
            } => {
                METRICS
                    .orders_total
                    .with_label_values(&[order.side.as_str(), origin])
                    .inc();

                let trades = self.orderbook.submit(order);
                if !trades.is_empty() {
                    METRICS
                        .trades_total
                        .with_label_values(&[origin])
                        .inc_by(trades.len() as f64);
                    debug!(
                        count = trades.len(),
                        origin,
                        mid = ?self.orderbook.mid_price(),
                        "orders matched"
                    );
                }
                METRICS.set_depth(self.orderbook.depth());
                METRICS.set_spread(self.orderbook.spread());

                // 调用方已放弃等待时，结果仍然已生效
                let _ = respond_to.send(trades.into_vec());
            }
            EngineCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.orderbook.get_orders());
            }
            EngineCommand::Reset { respond_to } => {
                self.orderbook.reset();
                METRICS.set_depth(self.orderbook.depth());
                METRICS.set_spread(None);
                info!("order book reset");
                let _ = respond_to.send(());
            }
        }
    }
}

/// Cloneable handle to a running `MatchingService`
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Spawns the service on the current tokio runtime
    pub fn spawn<OB: OrderBook>(orderbook: OB, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        tokio::spawn(MatchingService::new(orderbook, receiver).run());
        Self { sender }
    }

    /// Wraps an existing command sender (the caller runs the service)
    pub fn from_sender(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    /// Adds `order` to the book, matches, and returns the trades produced
    pub async fn submit(
        &self,
        order: Order,
        origin: &'static str,
    ) -> Result<Vec<Trade>, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.send(EngineCommand::Submit {
            order,
            origin,
            respond_to,
        })
        .await?;
        response.await.map_err(|_| EngineError::Closed)
    }

    pub async fn snapshot(&self) -> Result<BookSnapshot, EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.send(EngineCommand::Snapshot { respond_to }).await?;
        response.await.map_err(|_| EngineError::Closed)
    }

    pub async fn reset(&self) -> Result<(), EngineError> {
        let (respond_to, response) = oneshot::channel();
        self.send(EngineCommand::Reset { respond_to }).await?;
        response.await.map_err(|_| EngineError::Closed)
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.sender.send(command).await.map_err(|_| EngineError::Closed)
    }
}
