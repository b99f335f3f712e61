//! # Contact Decoder
//!
//! Turns raw multitouch events (protocol type B) into per-contact
//! down/move/up notifications.
//!
//! The kernel reports changes slot by slot and commits them with
//! `SYN_REPORT`:
//!
//! ```text
//! ABS_MT_SLOT 0
//! ABS_MT_TRACKING_ID 45      <- new contact in slot 0
//! ABS_MT_POSITION_X 1200
//! ABS_MT_POSITION_Y 800
//! SYN_REPORT                 <- Down { id: 45, .. }
//! ABS_MT_POSITION_X 1210
//! SYN_REPORT                 <- Move { id: 45, .. }
//! ABS_MT_TRACKING_ID -1
//! SYN_REPORT                 <- Up { id: 45 }
//! ```
//!
//! Tracking ids are unique per contact, so they double as pointer ids.
//!
//! evdev's `EventStream` resynchronises after a kernel buffer overrun and
//! never yields `SYN_DROPPED`. The decoder still handles it for raw event
//! sources: every contact is lifted and events up to the next `SYN_REPORT`
//! are discarded.

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Synchronization};
use tracing::{trace, warn};

use super::device::AxisRange;
use crate::input::PointerId;

/// Highest slot index accepted; larger indices are ignored.
const MAX_SLOTS: usize = 32;

/// One committed change of a contact, in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    Down { id: PointerId, x: f32, y: f32 },
    Move { id: PointerId, x: f32, y: f32 },
    Up { id: PointerId },
}

/// Maps raw device coordinates onto the logical surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub width: f32,
    pub height: f32,
}

impl SurfaceMapping {
    fn map(&self, raw_x: i32, raw_y: i32) -> (f32, f32) {
        (
            self.x_range.scale(raw_x, self.width),
            self.y_range.scale(raw_y, self.height),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    tracking_id: Option<i32>,
    reported: Option<i32>,
    x: i32,
    y: i32,
    moved: bool,
}

/// Stateful decoder for one device's event stream.
#[derive(Debug, Clone)]
pub struct ContactDecoder {
    mapping: SurfaceMapping,
    slots: Vec<Slot>,
    current: usize,
    /// Discarding events until the next `SYN_REPORT`
    dropping: bool,
}

impl ContactDecoder {
    pub fn new(mapping: SurfaceMapping) -> Self {
        Self {
            mapping,
            slots: vec![Slot::default()],
            current: 0,
            dropping: false,
        }
    }

    /// Number of contacts currently down.
    pub fn active_contacts(&self) -> usize {
        self.slots.iter().filter(|s| s.reported.is_some()).count()
    }

    /// Feeds one raw event. Contacts are only produced on `SYN_REPORT`.
    pub fn feed(&mut self, event: &InputEvent) -> Vec<Contact> {
        match event.kind() {
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) if self.dropping => {
                self.dropping = false;
                Vec::new()
            }
            _ if self.dropping => Vec::new(),
            InputEventKind::AbsAxis(axis) => {
                self.apply_axis(axis, event.value());
                Vec::new()
            }
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) => self.commit(),
            InputEventKind::Synchronization(Synchronization::SYN_DROPPED) => {
                warn!("Touch events dropped by the kernel, lifting all contacts");
                self.dropping = true;
                self.lift_all()
            }
            _ => Vec::new(),
        }
    }

    /// Reports every active contact as lifted.
    ///
    /// Slot positions are kept, so a contact that later reappears with only
    /// a new tracking id starts from its last known coordinates.
    pub fn lift_all(&mut self) -> Vec<Contact> {
        let mut lifted = Vec::new();
        for slot in &mut self.slots {
            if let Some(id) = slot.reported.take() {
                lifted.push(Contact::Up { id: PointerId(id) });
            }
            slot.tracking_id = None;
            slot.moved = false;
        }
        lifted
    }

    fn apply_axis(&mut self, axis: AbsoluteAxisType, value: i32) {
        if axis == AbsoluteAxisType::ABS_MT_SLOT {
            match usize::try_from(value) {
                Ok(slot) if slot < MAX_SLOTS => {
                    if slot >= self.slots.len() {
                        self.slots.resize(slot + 1, Slot::default());
                    }
                    self.current = slot;
                }
                _ => trace!("Ignoring slot {}", value),
            }
            return;
        }

        let slot = &mut self.slots[self.current];
        if axis == AbsoluteAxisType::ABS_MT_TRACKING_ID {
            slot.tracking_id = (value >= 0).then_some(value);
        } else if axis == AbsoluteAxisType::ABS_MT_POSITION_X {
            slot.x = value;
            slot.moved = true;
        } else if axis == AbsoluteAxisType::ABS_MT_POSITION_Y {
            slot.y = value;
            slot.moved = true;
        }
    }

    fn commit(&mut self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for slot in &mut self.slots {
            // A slot reused by a new contact within one frame lifts the old one first
            if let Some(old) = slot.reported {
                if slot.tracking_id != Some(old) {
                    contacts.push(Contact::Up { id: PointerId(old) });
                    slot.reported = None;
                }
            }

            let Some(id) = slot.tracking_id else {
                slot.moved = false;
                continue;
            };
            let (x, y) = self.mapping.map(slot.x, slot.y);
            let id = PointerId(id);

            if slot.reported.is_none() {
                contacts.push(Contact::Down { id, x, y });
                slot.reported = Some(id.0);
            } else if slot.moved {
                contacts.push(Contact::Move { id, x, y });
            }
            slot.moved = false;
        }
        contacts
    }
}
