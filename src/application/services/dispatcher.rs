/// Request Dispatcher - Server-side handling of peer requests
///
/// Turns one inbound frame into exactly one reply. Malformed input is
/// answered with a status, never with a dropped connection.
///
/// | input                              | reply                               |
/// |------------------------------------|-------------------------------------|
/// | empty / `null` / undecodable       | `{status: "invalid request"}`       |
/// | `order` with a non-positive field  | `{status: "invalid request"}`       |
/// | `order`                            | `{status: "order received", trades}`|
/// | `getOrders`                        | `{buys, sells}`                     |
/// | any other `type`                   | `{status: "unknown request"}`       |
/// | engine stopped                     | `{status: "engine unavailable"}`    |

use super::matching_service::EngineHandle;
use crate::domain::validation::OrderValidator;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{PeerReply, PeerRequest};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    engine: EngineHandle,
    validator: OrderValidator,
}

impl RequestDispatcher {
    pub fn new(engine: EngineHandle, validator: OrderValidator) -> Self {
        Self { engine, validator }
    }

    /// Decodes a raw frame and handles it
    pub async fn dispatch(&self, payload: &[u8]) -> PeerReply {
        match serde_json::from_slice::<Option<PeerRequest>>(payload) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!("undecodable request: {}", e);
                METRICS.peer_requests_total.with_label_values(&["invalid"]).inc();
                PeerReply::invalid_request()
            }
        }
    }

    /// Handles an already decoded request; `None` is a `null` payload
    pub async fn handle(&self, request: Option<PeerRequest>) -> PeerReply {
        let Some(request) = request else {
            METRICS.peer_requests_total.with_label_values(&["invalid"]).inc();
            return PeerReply::invalid_request();
        };
        METRICS
            .peer_requests_total
            .with_label_values(&[request.kind()])
            .inc();

        match request {
            PeerRequest::Order { order } => {
                if let Err(e) = self.validator.validate(&order) {
                    debug!(id = %order.id, "rejecting peer order: {}", e);
                    return PeerReply::invalid_request();
                }
                match self.engine.submit(order, "remote").await {
                    Ok(trades) => PeerReply::order_received(trades),
                    Err(e) => {
                        warn!("order dropped: {}", e);
                        METRICS.errors_total.with_label_values(&["engine"]).inc();
                        PeerReply::engine_unavailable()
                    }
                }
            }
            PeerRequest::GetOrders => match self.engine.snapshot().await {
                Ok(snapshot) => PeerReply::Book(snapshot),
                Err(e) => {
                    warn!("snapshot failed: {}", e);
                    METRICS.errors_total.with_label_values(&["engine"]).inc();
                    PeerReply::engine_unavailable()
                }
            },
            PeerRequest::Unknown => PeerReply::unknown_request(),
        }
    }
}
