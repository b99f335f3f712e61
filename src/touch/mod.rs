//! # Touch Module
//!
//! Linux touchscreen front end.
//!
//! This module handles:
//! - Multitouch device detection and opening via evdev
//! - Decoding multitouch protocol type B into contact down/move/up
//! - Routing contacts to the joystick, face buttons and tap buttons

pub mod contacts;
pub mod device;
pub mod dispatch;

pub use contacts::{Contact, ContactDecoder, SurfaceMapping};
pub use device::{AxisRange, TouchDevice};
pub use dispatch::{ButtonRegion, Dispatcher, Layout, Rect};
