//! Peer-to-peer limit order exchange.
//!
//! Every peer keeps its own price-time priority order book, answers order
//! and snapshot requests from other peers over framed TCP, and broadcasts
//! its own orders to every peer it finds through a rendezvous service.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod node;
pub mod shared;
