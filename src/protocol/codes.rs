//! # Control Codes
//!
//! Integer identifiers for the emulated pad's axes and buttons. The receiver
//! feeds them straight into a Linux uinput device, so they are the kernel's
//! input event codes.
//!
//! | Control | Code | evdev name |
//! |---------|------|------------|
//! | Stick X | 0 | ABS_X |
//! | Stick Y | 1 | ABS_Y |
//! | A | 304 | BTN_SOUTH |
//! | B | 305 | BTN_EAST |
//! | X | 307 | BTN_NORTH |
//! | Y | 308 | BTN_WEST |
//! | Select | 314 | BTN_SELECT |
//! | Start | 315 | BTN_START |

/// Left stick horizontal axis.
pub const AXIS_X: u16 = 0x00;
/// Left stick vertical axis.
pub const AXIS_Y: u16 = 0x01;

/// A face button.
pub const BTN_A: u16 = 0x130;
/// B face button.
pub const BTN_B: u16 = 0x131;
/// X face button.
pub const BTN_X: u16 = 0x133;
/// Y face button.
pub const BTN_Y: u16 = 0x134;
/// Select (back) button.
///
/// Earlier web clients sent 315 for Select and 314 for Start; receivers
/// built against that mapping see the two swapped.
pub const BTN_SELECT: u16 = 0x13a;
/// Start button.
pub const BTN_START: u16 = 0x13b;

/// Face buttons in the order they are laid out by default (top, left, right, bottom).
pub const FACE_BUTTONS: [u16; 4] = [BTN_Y, BTN_X, BTN_B, BTN_A];

/// Axis value range (signed 16-bit).
pub const AXIS_VALUE_MIN: i32 = i16::MIN as i32;
/// Axis value range (signed 16-bit).
pub const AXIS_VALUE_MAX: i32 = i16::MAX as i32;

/// Button value when pressed.
pub const BUTTON_PRESSED: u8 = 1;
/// Button value when released.
pub const BUTTON_RELEASED: u8 = 0;

/// Human-readable label for a known control code.
#[must_use]
pub fn label(code: u16) -> Option<&'static str> {
    match code {
        BTN_A => Some("A"),
        BTN_B => Some("B"),
        BTN_X => Some("X"),
        BTN_Y => Some("Y"),
        BTN_SELECT => Some("Select"),
        BTN_START => Some("Start"),
        _ => None,
    }
}
