//! # Tap Buttons
//!
//! Start and Select behave like momentary taps: touching them sends a
//! press at once and the matching release a fixed time later, whatever
//! the finger does in between. The scheduler only keeps the deadlines;
//! the event loop sleeps until [`TapScheduler::next_deadline`] and then
//! collects the releases with [`TapScheduler::due`].

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::protocol::OutboundEvent;

/// Default time between a tap's press and release.
pub const DEFAULT_TAP_DURATION: Duration = Duration::from_millis(100);

/// Deadline queue of pending tap releases.
#[derive(Debug, Clone)]
pub struct TapScheduler {
    hold: Duration,
    pending: VecDeque<(Instant, u16)>,
}

impl Default for TapScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_DURATION)
    }
}

impl TapScheduler {
    /// Creates a scheduler releasing taps after `hold`.
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            pending: VecDeque::new(),
        }
    }

    /// Starts a tap of `code` at `now`.
    ///
    /// Returns the press event, or `None` if a tap of the same code is
    /// still waiting for its release.
    pub fn tap(&mut self, code: u16, now: Instant) -> Option<OutboundEvent> {
        if self.is_pending(code) {
            return None;
        }
        debug!("Tap on button {} ({:?} hold)", code, self.hold);
        self.pending.push_back((now + self.hold, code));
        Some(OutboundEvent::button(code, true))
    }

    /// Whether `code` has a release scheduled.
    #[must_use]
    pub fn is_pending(&self, code: u16) -> bool {
        self.pending.iter().any(|&(_, c)| c == code)
    }

    /// Earliest scheduled release, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.front().map(|&(deadline, _)| deadline)
    }

    /// Removes and returns every release due at `now`.
    pub fn due(&mut self, now: Instant) -> Vec<OutboundEvent> {
        let mut released = Vec::new();
        while let Some(&(deadline, code)) = self.pending.front() {
            if deadline > now {
                break;
            }
            self.pending.pop_front();
            released.push(OutboundEvent::button(code, false));
        }
        released
    }

    /// Removes every pending tap and returns its release immediately.
    pub fn drain(&mut self) -> Vec<OutboundEvent> {
        self.pending
            .drain(..)
            .map(|(_, code)| OutboundEvent::button(code, false))
            .collect()
    }
}
