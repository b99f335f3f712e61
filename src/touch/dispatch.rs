//! # Contact Dispatcher
//!
//! Routes decoded contacts to the on-screen controls.
//!
//! A contact is claimed by the control it lands on and keeps that control
//! until it lifts:
//!
//! - face button -> pressed while the contact is down
//! - tap button -> pressed, released after the tap duration
//! - joystick zone -> drives the stick
//!
//! Buttons are hit-tested before the joystick zone, so a button drawn on
//! top of the zone wins. Contacts that land on nothing are ignored.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use super::contacts::Contact;
use crate::config::{ButtonConfig, Config, RectConfig};
use crate::input::{
    ButtonEdgeTracker, Haptics, JoystickGeometry, Point, PointerId, PointerTracker, StickVector, TapScheduler,
};
use crate::protocol::OutboundEvent;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < self.origin.x + self.width
            && p.y < self.origin.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.origin.x + self.width / 2.0, self.origin.y + self.height / 2.0)
    }
}

impl From<RectConfig> for Rect {
    fn from(r: RectConfig) -> Self {
        Self {
            origin: Point::new(r.x, r.y),
            width: r.width,
            height: r.height,
        }
    }
}

/// Round hit area of one button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonRegion {
    pub code: u16,
    pub center: Point,
    pub radius: f32,
}

impl ButtonRegion {
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance_to(p) <= self.radius
    }
}

impl From<ButtonConfig> for ButtonRegion {
    fn from(b: ButtonConfig) -> Self {
        Self {
            code: b.code,
            center: Point::new(b.x, b.y),
            radius: b.diameter / 2.0,
        }
    }
}

/// Where every control sits on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub joystick_zone: Rect,
    pub joystick: JoystickGeometry,
    pub x_axis: u16,
    pub y_axis: u16,
    pub face: Vec<ButtonRegion>,
    pub tap: Vec<ButtonRegion>,
}

impl Layout {
    /// Builds the layout; the joystick base rests at the centre of its zone.
    pub fn from_config(config: &Config) -> Self {
        let joystick_zone = Rect::from(config.joystick.zone);
        Self {
            joystick_zone,
            joystick: JoystickGeometry::from_size(
                joystick_zone.center(),
                config.joystick.size,
                config.joystick.knob_size,
            ),
            x_axis: config.joystick.x_axis,
            y_axis: config.joystick.y_axis,
            face: config.buttons.face.iter().copied().map(ButtonRegion::from).collect(),
            tap: config.buttons.tap.iter().copied().map(ButtonRegion::from).collect(),
        }
    }
}

/// What a contact is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Stick,
    Button(u16),
    Tap,
}

/// Turns contacts into controller events.
pub struct Dispatcher<H> {
    layout: Layout,
    stick: PointerTracker,
    buttons: ButtonEdgeTracker<H>,
    taps: TapScheduler,
    claims: HashMap<PointerId, Claim>,
    /// Contacts currently down on each held button.
    holders: HashMap<u16, usize>,
}

impl<H: Haptics> Dispatcher<H> {
    pub fn new(layout: Layout, haptics: H, haptic_pulse: Duration, tap_duration: Duration) -> Self {
        let buttons = ButtonEdgeTracker::new(layout.face.iter().map(|b| b.code), haptics, haptic_pulse);
        Self {
            stick: PointerTracker::new(layout.joystick),
            buttons,
            taps: TapScheduler::new(tap_duration),
            claims: HashMap::new(),
            holders: HashMap::new(),
            layout,
        }
    }

    pub fn from_config(config: &Config, haptics: H) -> Self {
        Self::new(
            Layout::from_config(config),
            haptics,
            config.buttons.haptic_pulse(),
            config.buttons.tap_duration(),
        )
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn stick(&self) -> &PointerTracker {
        &self.stick
    }

    /// Handles one contact change observed at `now`.
    pub fn handle(&mut self, contact: Contact, now: Instant) -> Vec<OutboundEvent> {
        match contact {
            Contact::Down { id, x, y } => self.down(id, Point::new(x, y), now),
            Contact::Move { id, x, y } => match self.claims.get(&id) {
                Some(Claim::Stick) => {
                    let vector = self.stick.move_to(id, x, y);
                    self.stick_events(vector)
                }
                _ => Vec::new(),
            },
            Contact::Up { id } => match self.claims.remove(&id) {
                Some(Claim::Stick) => {
                    let vector = self.stick.end(id);
                    self.stick_events(vector)
                }
                Some(Claim::Button(code)) => self.lift_button(code),
                Some(Claim::Tap) | None => Vec::new(),
            },
        }
    }

    /// Releases everything currently held: the stick returns to neutral,
    /// held buttons are released and pending taps release immediately.
    pub fn release_all(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        if let Some(id) = self.stick.tracked_pointer() {
            let vector = self.stick.end(id);
            events.extend(self.stick_events(vector));
        }
        events.extend(self.buttons.release_all());
        events.extend(self.taps.drain());
        self.claims.clear();
        self.holders.clear();
        events
    }

    /// Earliest pending tap release.
    pub fn next_tap_deadline(&self) -> Option<Instant> {
        self.taps.next_deadline()
    }

    /// Tap releases due at `now`.
    pub fn taps_due(&mut self, now: Instant) -> Vec<OutboundEvent> {
        self.taps.due(now)
    }

    fn down(&mut self, id: PointerId, p: Point, now: Instant) -> Vec<OutboundEvent> {
        if let Some(code) = self.layout.face.iter().find(|b| b.contains(p)).map(|b| b.code) {
            self.claims.insert(id, Claim::Button(code));
            *self.holders.entry(code).or_default() += 1;
            return self.buttons.press(code).into_iter().collect();
        }

        if let Some(code) = self.layout.tap.iter().find(|b| b.contains(p)).map(|b| b.code) {
            self.claims.insert(id, Claim::Tap);
            return self.taps.tap(code, now).into_iter().collect();
        }

        if self.layout.joystick_zone.contains(p) {
            let vector = self.stick.start(id, p.x, p.y);
            if vector.is_some() {
                self.claims.insert(id, Claim::Stick);
            }
            return self.stick_events(vector);
        }

        trace!("Contact {:?} at ({}, {}) hit no control", id, p.x, p.y);
        Vec::new()
    }

    /// Releases `code` once the last contact holding it lifts.
    fn lift_button(&mut self, code: u16) -> Vec<OutboundEvent> {
        match self.holders.get_mut(&code) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Vec::new()
            }
            _ => {
                self.holders.remove(&code);
                self.buttons.release(code).into_iter().collect()
            }
        }
    }

    fn stick_events(&self, vector: Option<StickVector>) -> Vec<OutboundEvent> {
        match vector {
            Some(v) => {
                debug!("Stick ({:.3}, {:.3})", v.x, v.y);
                v.to_axis_events(self.layout.x_axis, self.layout.y_axis).to_vec()
            }
            None => Vec::new(),
        }
    }
}
