/// Submission Orchestrator - Client-side order workflow
///
/// ## Workflow
/// 1. Parse and validate the raw side/price/quantity input
/// 2. Stamp a fresh id (UUID v4) and a strictly increasing timestamp
/// 3. Apply the order to the local engine (add + match, atomically)
/// 4. Broadcast `{type: "order", order}` to every peer under the topic and
///    collect their replies in arrival order, bounded by one deadline
///
/// Nothing is applied or broadcast when step 1 fails. Fan-out failures never
/// fail the submission; they show up as `{error}` entries in `replies`.

use super::matching_service::{EngineError, EngineHandle};
use crate::domain::entities::{Order, Trade};
use crate::domain::validation::{OrderParams, OrderValidator, ValidationError};
use crate::infrastructure::network::traits::PeerChannel;
use crate::shared::protocol::{PeerRequest, PeerResult};
use crate::shared::timestamp::MonotonicClock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The order as it was built and sent
    pub order: Order,
    /// Trades the order produced in this node's own book
    pub local_trades: Vec<Trade>,
    /// One entry per remote peer, in arrival order
    pub replies: Vec<PeerResult>,
}

/// Submission errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct SubmissionOrchestrator {
    engine: EngineHandle,
    channel: Arc<dyn PeerChannel>,
    clock: Arc<MonotonicClock>,
    validator: OrderValidator,
    topic: String,
    timeout: Duration,
}

impl SubmissionOrchestrator {
    pub fn new(
        engine: EngineHandle,
        channel: Arc<dyn PeerChannel>,
        validator: OrderValidator,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            channel,
            clock: Arc::new(MonotonicClock::new()),
            validator,
            topic: topic.into(),
            timeout,
        }
    }

    /// Submits raw user input, e.g. `("buy", "100.5", "2")`
    pub async fn submit(
        &self,
        side: &str,
        price: &str,
        quantity: &str,
    ) -> Result<Submission, SubmitError> {
        let params = self.validator.parse_submission(side, price, quantity)?;
        self.submit_params(params).await
    }

    /// Submits already validated parameters
    pub async fn submit_params(&self, params: OrderParams) -> Result<Submission, SubmitError> {
        let order = Order::new(
            Uuid::new_v4().simple().to_string(),
            params.side,
            params.price,
            params.quantity,
            self.clock.now(),
        );

        let local_trades = self.engine.submit(order.clone(), "local").await?;
        info!(
            id = %order.id,
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            trades = local_trades.len(),
            "order applied locally"
        );

        let replies = self
            .broadcast(&PeerRequest::Order {
                order: order.clone(),
            })
            .await;

        Ok(Submission {
            order,
            local_trades,
            replies,
        })
    }

    /// Sends `request` to every peer under the topic and gathers the results
    ///
    /// A failed peer lookup yields a single error entry.
    pub async fn broadcast(&self, request: &PeerRequest) -> Vec<PeerResult> {
        match self.channel.map(&self.topic, request, self.timeout).await {
            Ok(replies) => replies,
            Err(e) => {
                warn!(kind = request.kind(), "broadcast failed: {}", e);
                vec![PeerResult::error(e)]
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Side;
    use crate::domain::orderbook::PriceTimeOrderBook;
    use crate::infrastructure::network::traits::ChannelError;
    use crate::shared::protocol::PeerReply;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    /// Records requests and answers with a canned result
    struct RecordingChannel {
        seen: Mutex<Vec<PeerRequest>>,
        result: Result<Vec<PeerResult>, ChannelError>,
    }

    impl RecordingChannel {
        fn new(result: Result<Vec<PeerResult>, ChannelError>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                result,
            })
        }
    }

    #[async_trait]
    impl PeerChannel for RecordingChannel {
        async fn map(
            &self,
            _topic: &str,
            request: &PeerRequest,
            _timeout: Duration,
        ) -> Result<Vec<PeerResult>, ChannelError> {
            self.seen.lock().push(request.clone());
            self.result.clone()
        }
    }

    fn orchestrator(channel: Arc<RecordingChannel>) -> (SubmissionOrchestrator, EngineHandle) {
        let engine = EngineHandle::spawn(PriceTimeOrderBook::new(), 16);
        let orchestrator = SubmissionOrchestrator::new(
            engine.clone(),
            channel,
            OrderValidator::new(),
            "exchange_orders",
            Duration::from_secs(1),
        );
        (orchestrator, engine)
    }

    #[tokio::test]
    async fn test_applies_locally_then_broadcasts() {
        let channel = RecordingChannel::new(Ok(vec![PeerResult::Reply(
            PeerReply::order_received(vec![]),
        )]));
        let (orchestrator, engine) = orchestrator(channel.clone());

        let submission = orchestrator.submit("buy", "100", "2").await.unwrap();
        assert_eq!(submission.order.side, Side::Buy);
        assert_eq!(submission.order.price, dec!(100));
        assert_eq!(submission.order.id.len(), 32);
        assert!(submission.local_trades.is_empty());
        assert_eq!(submission.replies.len(), 1);

        let book = engine.snapshot().await.unwrap();
        assert_eq!(book.buys.len(), 1);
        assert_eq!(book.buys[0].id, submission.order.id);

        let seen = channel.seen.lock();
        assert_eq!(
            seen.as_slice(),
            &[PeerRequest::Order {
                order: submission.order.clone()
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_applied_or_sent() {
        let channel = RecordingChannel::new(Ok(vec![]));
        let (orchestrator, engine) = orchestrator(channel.clone());

        let err = orchestrator.submit("buy", "abc", "1").await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(ValidationError::InvalidPrice(_))));
        assert!(orchestrator.submit("buy", "100", "-1").await.is_err());
        assert!(orchestrator.submit("short", "100", "1").await.is_err());

        assert!(engine.snapshot().await.unwrap().is_empty());
        assert!(channel.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_becomes_single_error_entry() {
        let channel = RecordingChannel::new(Err(ChannelError::Rendezvous("unreachable".into())));
        let (orchestrator, engine) = orchestrator(channel);

        let submission = orchestrator.submit("sell", "10", "1").await.unwrap();
        assert_eq!(submission.replies.len(), 1);
        assert!(submission.replies[0].is_error());
        // 本地仍然生效
        assert_eq!(engine.snapshot().await.unwrap().sells.len(), 1);
    }

    #[tokio::test]
    async fn test_no_peers_is_empty_not_error() {
        let channel = RecordingChannel::new(Ok(vec![]));
        let (orchestrator, _engine) = orchestrator(channel);

        let submission = orchestrator.submit("sell", "10", "1").await.unwrap();
        assert!(submission.replies.is_empty());
    }

    #[tokio::test]
    async fn test_local_trades_reported() {
        let channel = RecordingChannel::new(Ok(vec![]));
        let (orchestrator, _engine) = orchestrator(channel);

        orchestrator.submit("sell", "100", "1").await.unwrap();
        let submission = orchestrator.submit("buy", "101", "1").await.unwrap();
        assert_eq!(submission.local_trades.len(), 1);
        assert_eq!(submission.local_trades[0].price, dec!(100));
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let channel = RecordingChannel::new(Ok(vec![]));
        let (orchestrator, _engine) = orchestrator(channel);

        let a = orchestrator.submit("buy", "1", "1").await.unwrap();
        let b = orchestrator.submit("buy", "1", "1").await.unwrap();
        assert!(b.order.timestamp > a.order.timestamp);
        assert_ne!(a.order.id, b.order.id);
    }
}
