//! # Stick Axis Scaling
//!
//! Converts normalized stick vectors to the receiver's axis events.
//!
//! ## Value Ranges
//!
//! - Stick vector: -1.0 to 1.0 per component, "up" positive
//! - Axis output: -32768 to 32767 (signed 16-bit)
//!
//! The vertical axis is flipped on the way out: the receiver follows the
//! evdev convention where pushing the stick up yields a negative `ABS_Y`.
//!
//! ```
//! use touch_gamepad::input::StickVector;
//! use touch_gamepad::protocol::OutboundEvent;
//!
//! let events = StickVector::new(1.0, 0.0).to_axis_events(0, 1);
//! assert_eq!(events[0], OutboundEvent::Axis { code: 0, value: 32767 });
//! assert_eq!(events[1], OutboundEvent::Axis { code: 1, value: 0 });
//! ```

use crate::protocol::codes::AXIS_VALUE_MAX;
use crate::protocol::OutboundEvent;

/// A stick deflection in the unit disk.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickVector {
    /// Horizontal component, right positive.
    pub x: f32,
    /// Vertical component, up positive.
    pub y: f32,
}

impl StickVector {
    /// The centered (neutral) vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a stick vector.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Length of the vector.
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Whether the stick is exactly centered.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Builds the pair of axis events for this vector, horizontal first.
    #[must_use]
    pub fn to_axis_events(&self, x_code: u16, y_code: u16) -> [OutboundEvent; 2] {
        [
            OutboundEvent::axis(x_code, scale_to_axis(self.x)),
            OutboundEvent::axis(y_code, scale_to_axis(-self.y)),
        ]
    }
}

/// Scales a normalized component (-1.0 to 1.0) to a signed 16-bit axis value.
///
/// Rounds toward negative infinity and saturates outside the unit range.
///
/// # Examples
///
/// ```
/// use touch_gamepad::input::axis::scale_to_axis;
///
/// assert_eq!(scale_to_axis(1.0), 32767);
/// assert_eq!(scale_to_axis(0.0), 0);
/// assert_eq!(scale_to_axis(-1.0), -32767);
/// ```
#[must_use]
pub fn scale_to_axis(normalized: f32) -> i32 {
    if normalized.is_nan() {
        return 0;
    }
    let scaled = (f64::from(normalized) * f64::from(AXIS_VALUE_MAX)).floor();
    scaled.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i32
}
