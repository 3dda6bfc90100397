//! Peer-to-peer message protocol
//!
//! Every frame on a peer connection carries one JSON document. Requests are
//! tagged by `type`; an unrecognised `type` decodes to `PeerRequest::Unknown`
//! so the dispatcher can answer it instead of dropping the frame.

use crate::domain::entities::{BookSnapshot, Order, Trade};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical topic under which exchange peers announce themselves
pub const DEFAULT_TOPIC: &str = "exchange_orders";

/// Requests one peer sends another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerRequest {
    /// Apply an order to the receiver's book and report its trades
    #[serde(rename = "order")]
    Order { order: Order },

    /// Ask for a snapshot of the receiver's book
    #[serde(rename = "getOrders")]
    GetOrders,

    /// Any `type` this node does not understand
    #[serde(other, skip_serializing)]
    Unknown,
}

impl PeerRequest {
    /// Label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PeerRequest::Order { .. } => "order",
            PeerRequest::GetOrders => "getOrders",
            PeerRequest::Unknown => "unknown",
        }
    }
}

/// Status strings carried by non-snapshot replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    #[serde(rename = "order received")]
    OrderReceived,
    #[serde(rename = "invalid request")]
    InvalidRequest,
    #[serde(rename = "unknown request")]
    UnknownRequest,
    #[serde(rename = "engine unavailable")]
    EngineUnavailable,
    #[serde(rename = "reply too large")]
    ReplyTooLarge,
}

impl ReplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyStatus::OrderReceived => "order received",
            ReplyStatus::InvalidRequest => "invalid request",
            ReplyStatus::UnknownRequest => "unknown request",
            ReplyStatus::EngineUnavailable => "engine unavailable",
            ReplyStatus::ReplyTooLarge => "reply too large",
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replies one peer sends back for each request
///
/// Untagged on the wire; variants are tried in declaration order, so the
/// variant with `trades` must stay ahead of the bare status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerReply {
    OrderReceived {
        status: ReplyStatus,
        trades: Vec<Trade>,
    },
    Status {
        status: ReplyStatus,
    },
    Book(BookSnapshot),
}

impl PeerReply {
    pub fn order_received(trades: Vec<Trade>) -> Self {
        PeerReply::OrderReceived {
            status: ReplyStatus::OrderReceived,
            trades,
        }
    }

    pub fn invalid_request() -> Self {
        PeerReply::Status {
            status: ReplyStatus::InvalidRequest,
        }
    }

    pub fn unknown_request() -> Self {
        PeerReply::Status {
            status: ReplyStatus::UnknownRequest,
        }
    }

    pub fn engine_unavailable() -> Self {
        PeerReply::Status {
            status: ReplyStatus::EngineUnavailable,
        }
    }

    /// Sent in place of a reply whose encoding exceeds the frame limit
    pub fn reply_too_large() -> Self {
        PeerReply::Status {
            status: ReplyStatus::ReplyTooLarge,
        }
    }

    /// Status of the reply, `None` for a book snapshot
    pub fn status(&self) -> Option<ReplyStatus> {
        match self {
            PeerReply::OrderReceived { status, .. } | PeerReply::Status { status } => Some(*status),
            PeerReply::Book(_) => None,
        }
    }

    pub fn trades(&self) -> &[Trade] {
        match self {
            PeerReply::OrderReceived { trades, .. } => trades,
            _ => &[],
        }
    }
}

/// One entry of a fan-out result, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerResult {
    Reply(PeerReply),
    Error { error: String },
}

impl PeerResult {
    pub fn error(message: impl fmt::Display) -> Self {
        PeerResult::Error {
            error: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PeerResult::Error { .. })
    }

    pub fn reply(&self) -> Option<&PeerReply> {
        match self {
            PeerResult::Reply(reply) => Some(reply),
            PeerResult::Error { .. } => None,
        }
    }
}
