//! # Session Module
//!
//! The single connection to the receiver.
//!
//! This module handles:
//! - Connection state (Connecting / Open / Closed), no reconnection
//! - Heartbeat pings and round-trip latency
//! - Dropping controller events while not connected
//! - The persistent client id carried in the endpoint URL
//! - The WebSocket transport and its writer task

pub mod heartbeat;
pub mod identity;
pub mod manager;
pub mod transport;
pub mod websocket;

pub use heartbeat::{Heartbeat, HeartbeatTimer, HEARTBEAT_INTERVAL};
pub use identity::{FileIdentityProvider, IdentityProvider, StaticIdentity};
pub use manager::{ConnectionState, SessionManager, SessionStatus};
pub use transport::Transport;
pub use websocket::{apply_inbound_frame, connect, Connection, WsOutbox};
