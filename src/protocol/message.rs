//! # Wire Messages
//!
//! JSON records discriminated by a `kind` field:
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | out | `{"kind":"axis","code":0,"value":-32767}` |
//! | out | `{"kind":"btn","code":304,"value":1}` |
//! | out | `{"kind":"ping"}` |
//! | in  | `{"kind":"pong"}` (axis/btn shapes are accepted and ignored) |

use serde::{Deserialize, Serialize};

use super::codes::{AXIS_VALUE_MAX, AXIS_VALUE_MIN, BUTTON_PRESSED, BUTTON_RELEASED};
use crate::error::{GamepadError, Result};

/// A domain event ready to go on the wire.
///
/// The value fields are typed so that out-of-range values cannot be
/// represented: axes are signed 16-bit, buttons are built from a `bool`.
///
/// # Examples
///
/// ```
/// use touch_gamepad::protocol::{encode_outbound, OutboundEvent};
///
/// let json = encode_outbound(&OutboundEvent::button(304, true))?;
/// assert_eq!(json, r#"{"kind":"btn","code":304,"value":1}"#);
/// # Ok::<(), touch_gamepad::error::GamepadError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// Absolute axis position.
    Axis {
        /// Axis code (e.g. `ABS_X`).
        code: u16,
        /// Position, -32768..=32767.
        value: i16,
    },
    /// Button transition.
    #[serde(rename = "btn")]
    Button {
        /// Button code (e.g. `BTN_SOUTH`).
        code: u16,
        /// 1 = pressed, 0 = released.
        value: u8,
    },
    /// Heartbeat request.
    Ping,
}

impl OutboundEvent {
    /// Builds an axis event, saturating `value` to the signed 16-bit range.
    #[must_use]
    pub fn axis(code: u16, value: i32) -> Self {
        let value = value.clamp(AXIS_VALUE_MIN, AXIS_VALUE_MAX) as i16;
        Self::Axis { code, value }
    }

    /// Builds a button event.
    #[must_use]
    pub fn button(code: u16, pressed: bool) -> Self {
        let value = if pressed { BUTTON_PRESSED } else { BUTTON_RELEASED };
        Self::Button { code, value }
    }

    /// Short name of the variant, as it appears in the `kind` field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Axis { .. } => "axis",
            Self::Button { .. } => "btn",
            Self::Ping => "ping",
        }
    }
}

/// Messages the receiver may send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Axis echo; not used by the client.
    Axis {
        /// Axis code.
        code: u16,
        /// Axis value.
        value: i32,
    },
    /// Button echo; not used by the client.
    #[serde(rename = "btn")]
    Button {
        /// Button code.
        code: u16,
        /// Button value.
        value: i32,
    },
    /// Heartbeat reply.
    Pong,
}

/// Serializes an outbound event to its JSON text form.
///
/// # Errors
///
/// Returns `Protocol` if serialization fails.
pub fn encode_outbound(event: &OutboundEvent) -> Result<String> {
    serde_json::to_string(event)
        .map_err(|e| GamepadError::Protocol(format!("Failed to encode {} message: {}", event.kind(), e)))
}

/// Parses an inbound text frame.
///
/// # Errors
///
/// Returns `Protocol` if the text is not JSON or carries an unknown `kind`.
pub fn decode_inbound(text: &str) -> Result<InboundMessage> {
    serde_json::from_str(text)
        .map_err(|e| GamepadError::Protocol(format!("Malformed inbound message: {}", e)))
}
