//! # Wire Protocol Module
//!
//! Message schema exchanged with the receiver over the WebSocket.
//!
//! This module handles:
//! - Outbound axis / button / ping messages (`kind`-tagged JSON)
//! - Inbound pong decoding (plus the echo shapes the core ignores)
//! - Control codes for the emulated pad's axes and buttons
//! - Deriving the receiver endpoint from an origin and client id
//!
//! The protocol carries no sequence numbers or acknowledgements; ordering
//! and delivery are whatever the underlying WebSocket provides.

pub mod codes;
pub mod endpoint;
pub mod message;

pub use endpoint::Endpoint;
pub use message::{decode_inbound, encode_outbound, InboundMessage, OutboundEvent};
