//! # Button Edge Tracker
//!
//! Converts raw press/release signals into edge-triggered button events.
//!
//! Touch surfaces report the same contact many times and may report a
//! release for a control that was never pressed (a finger sliding onto it,
//! a cancelled touch). The receiver must only ever see `0 -> 1` and
//! `1 -> 0` transitions, so the tracker keeps the set of held codes and
//! drops anything that is not a transition.
//!
//! ```
//! use std::time::Duration;
//! use touch_gamepad::input::{ButtonEdgeTracker, NoHaptics};
//! use touch_gamepad::protocol::OutboundEvent;
//!
//! let mut buttons = ButtonEdgeTracker::new([304, 305], NoHaptics, Duration::from_millis(15));
//! assert_eq!(buttons.press(304), Some(OutboundEvent::button(304, true)));
//! assert_eq!(buttons.press(304), None); // still held
//! assert_eq!(buttons.release(304), Some(OutboundEvent::button(304, false)));
//! assert_eq!(buttons.release(304), None); // already up
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::debug;

use crate::protocol::codes;
use crate::protocol::OutboundEvent;

/// Local tactile feedback.
#[cfg_attr(test, mockall::automock)]
pub trait Haptics {
    /// Fires a single vibration pulse.
    fn pulse(&mut self, duration: Duration);
}

/// Haptics for devices without an actuator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&mut self, _duration: Duration) {}
}

/// Edge-triggered state for a fixed set of buttons.
#[derive(Debug)]
pub struct ButtonEdgeTracker<H = NoHaptics> {
    controls: BTreeSet<u16>,
    pressed: BTreeSet<u16>,
    haptics: H,
    pulse: Duration,
}

impl<H: Haptics> ButtonEdgeTracker<H> {
    /// Creates a tracker for `controls` with nothing pressed.
    ///
    /// # Arguments
    ///
    /// * `controls` - Button codes this tracker owns; other codes are ignored
    /// * `haptics` - Feedback fired on each press transition
    /// * `pulse` - Length of the haptic pulse
    pub fn new(controls: impl IntoIterator<Item = u16>, haptics: H, pulse: Duration) -> Self {
        Self {
            controls: controls.into_iter().collect(),
            pressed: BTreeSet::new(),
            haptics,
            pulse,
        }
    }

    /// Whether `code` is one of this tracker's controls.
    #[must_use]
    pub fn owns(&self, code: u16) -> bool {
        self.controls.contains(&code)
    }

    /// Whether `code` is currently held.
    #[must_use]
    pub fn is_pressed(&self, code: u16) -> bool {
        self.pressed.contains(&code)
    }

    /// Codes currently held, in ascending order.
    pub fn pressed(&self) -> impl Iterator<Item = u16> + '_ {
        self.pressed.iter().copied()
    }

    /// Registers a press of `code`.
    ///
    /// Returns a press event only on the released -> pressed transition;
    /// the haptic pulse fires on that transition too.
    pub fn press(&mut self, code: u16) -> Option<OutboundEvent> {
        if !self.owns(code) {
            debug!("Ignoring press of unmanaged button code {}", code);
            return None;
        }
        if !self.pressed.insert(code) {
            return None;
        }

        self.haptics.pulse(self.pulse);
        debug!("Button {} pressed", codes::label(code).unwrap_or("?"));
        Some(OutboundEvent::button(code, true))
    }

    /// Registers a release of `code`.
    ///
    /// Returns a release event only on the pressed -> released transition.
    pub fn release(&mut self, code: u16) -> Option<OutboundEvent> {
        if !self.pressed.remove(&code) {
            return None;
        }

        debug!("Button {} released", codes::label(code).unwrap_or("?"));
        Some(OutboundEvent::button(code, false))
    }

    /// Releases every held button, e.g. when the input device goes away.
    pub fn release_all(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.pressed)
            .into_iter()
            .map(|code| OutboundEvent::button(code, false))
            .collect()
    }
}
