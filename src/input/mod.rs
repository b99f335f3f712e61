//! # Input Module
//!
//! Gesture state machines that turn raw pointer callbacks into controller
//! events.
//!
//! This module handles:
//! - Tracking one pointer per virtual joystick, with dynamic recentring and
//!   disk clamping
//! - Scaling stick vectors to signed 16-bit axis values
//! - Edge-triggered face buttons with a haptic pulse on press
//! - Timed press/release for tap buttons (Start/Select)
//!
//! Every transition function is synchronous and returns the events it
//! produced; none of them touch the network.

pub mod axis;
pub mod buttons;
pub mod pointer;
pub mod tap;

pub use axis::StickVector;
pub use buttons::{ButtonEdgeTracker, Haptics, NoHaptics};
pub use pointer::{JoystickGeometry, Point, PointerId, PointerTracker};
pub use tap::TapScheduler;
