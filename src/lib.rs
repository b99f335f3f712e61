//! # Touch Gamepad Library
//!
//! Turn a touchscreen into a virtual game controller.
//!
//! Touches on an on-screen joystick and buttons become axis and button
//! events that are streamed as JSON over a WebSocket to a receiver, which
//! feeds them to a virtual gamepad.
//!
//! The core (`input`, `protocol`, `session`) is synchronous and performs
//! no I/O of its own; `touch` and `runtime` connect it to a Linux
//! touchscreen and a tokio event loop.

pub mod config;
pub mod error;
pub mod input;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod touch;
