//! # Error Types
//!
//! Custom error types for Touch Gamepad using `thiserror`.

use thiserror::Error;

/// Main error type for Touch Gamepad
#[derive(Debug, Error)]
pub enum GamepadError {
    /// Wire protocol errors (malformed or unexpected frames)
    #[error("Wire protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Receiver endpoint could not be derived from the origin
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    /// Client identity could not be resolved
    #[error("Identity error: {0}")]
    Identity(String),

    /// Touchscreen errors (open, read, unsupported device)
    #[error("Touch device error: {0}")]
    TouchDevice(String),

    /// No multitouch device found while auto-detecting
    #[error("No multitouch touchscreen found in /dev/input")]
    TouchDeviceNotFound,

    /// The outbound transport is gone
    #[error("Transport closed")]
    TransportClosed,
}

/// Result type alias for Touch Gamepad
pub type Result<T> = std::result::Result<T, GamepadError>;
