//! # Pointer Tracker Module
//!
//! Turns the motion of one pointer (finger or mouse) into a clamped analog
//! stick vector for a single virtual joystick.
//!
//! ## Gesture Lifecycle
//!
//! | Call | Accepted when | Effect |
//! |------|---------------|--------|
//! | `start` | no gesture active | records the pointer id, picks the center |
//! | `move` | id matches the tracked pointer | recomputes the clamped offset |
//! | `end` | id matches the tracked pointer | clears the gesture, emits neutral |
//!
//! Calls for any other pointer id are inert: no state change, no event.
//!
//! ## Dynamic Recentring
//!
//! A pointer that lands within the base radius of the static center drives
//! the stick relative to that center straight away. A pointer that lands
//! anywhere else in the zone re-anchors the center under the finger and
//! starts from neutral, so the stick can be grabbed from any point of a
//! larger touch area.
//!
//! ## Usage
//!
//! ```
//! use touch_gamepad::input::{JoystickGeometry, Point, PointerId, PointerTracker, StickVector};
//!
//! let geometry = JoystickGeometry::from_size(Point::new(100.0, 100.0), 150.0, 50.0);
//! let mut tracker = PointerTracker::new(geometry);
//!
//! // Lands on the static center: neutral
//! assert_eq!(tracker.start(PointerId(7), 100.0, 100.0), Some(StickVector::ZERO));
//!
//! // Drag far right: clamped to full deflection
//! let v = tracker.move_to(PointerId(7), 300.0, 100.0).unwrap();
//! assert!((v.x - 1.0).abs() < 1e-6);
//!
//! // Another finger is ignored
//! assert_eq!(tracker.move_to(PointerId(8), 0.0, 0.0), None);
//!
//! // Release always returns to neutral
//! assert_eq!(tracker.end(PointerId(7)), Some(StickVector::ZERO));
//! ```

use tracing::{debug, trace};

use super::axis::StickVector;

/// Platform-assigned identifier of a contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub i32);

/// A position in the touch surface's coordinate space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate, down positive.
    pub y: f32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Static shape of one joystick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickGeometry {
    /// Center of the resting base.
    pub center: Point,
    /// Radius deciding between static and dynamic centering.
    pub base_radius: f32,
    /// Maximum knob travel from the center.
    pub max_offset: f32,
}

impl JoystickGeometry {
    /// Derives the geometry from the base diameter and knob diameter.
    ///
    /// The knob may travel until its edge touches the rim of the base, so
    /// `max_offset = size / 2 - knob_size / 2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use touch_gamepad::input::{JoystickGeometry, Point};
    ///
    /// let g = JoystickGeometry::from_size(Point::new(0.0, 0.0), 150.0, 50.0);
    /// assert_eq!(g.base_radius, 75.0);
    /// assert_eq!(g.max_offset, 50.0);
    /// ```
    #[must_use]
    pub fn from_size(center: Point, size: f32, knob_size: f32) -> Self {
        let base_radius = size / 2.0;
        Self {
            center,
            base_radius,
            max_offset: base_radius - knob_size / 2.0,
        }
    }
}

/// The one gesture a tracker may be following.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSession {
    /// Pointer driving this gesture.
    pub pointer_id: PointerId,
    /// Center the offset is measured from (static or re-anchored).
    pub center: Point,
    /// Current knob offset; its length never exceeds `max_offset`.
    pub offset: Point,
}

/// Single-gesture joystick state machine.
///
/// Not thread-safe; driven from the platform's event loop.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    geometry: JoystickGeometry,
    session: Option<PointerSession>,
}

impl PointerTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new(geometry: JoystickGeometry) -> Self {
        Self { geometry, session: None }
    }

    /// The joystick's static geometry.
    #[must_use]
    pub fn geometry(&self) -> &JoystickGeometry {
        &self.geometry
    }

    /// The active gesture, if any.
    #[must_use]
    pub fn session(&self) -> Option<&PointerSession> {
        self.session.as_ref()
    }

    /// Pointer currently tracked.
    #[must_use]
    pub fn tracked_pointer(&self) -> Option<PointerId> {
        self.session.map(|s| s.pointer_id)
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Current knob offset (zero when idle).
    #[must_use]
    pub fn offset(&self) -> Point {
        self.session.map(|s| s.offset).unwrap_or_default()
    }

    /// Current center (the static center when idle).
    #[must_use]
    pub fn center(&self) -> Point {
        self.session.map_or(self.geometry.center, |s| s.center)
    }

    /// Begins a gesture for `pointer_id` at `(x, y)`.
    ///
    /// Returns the initial stick vector, or `None` if a gesture is already
    /// in progress (the new pointer is ignored until the current one ends).
    pub fn start(&mut self, pointer_id: PointerId, x: f32, y: f32) -> Option<StickVector> {
        if let Some(active) = self.session {
            debug!(
                "Ignoring pointer {:?}: joystick already tracking {:?}",
                pointer_id, active.pointer_id
            );
            return None;
        }

        let down = Point::new(x, y);
        let session = if down.distance_to(self.geometry.center) <= self.geometry.base_radius {
            let (dx, dy) = clamp_offset(
                x - self.geometry.center.x,
                y - self.geometry.center.y,
                self.geometry.max_offset,
            );
            PointerSession {
                pointer_id,
                center: self.geometry.center,
                offset: Point::new(dx, dy),
            }
        } else {
            debug!("Pointer {:?} landed outside the base, recentring at ({}, {})", pointer_id, x, y);
            PointerSession {
                pointer_id,
                center: down,
                offset: Point::default(),
            }
        };

        self.session = Some(session);
        Some(self.normalized(session.offset))
    }

    /// Moves the tracked pointer to `(x, y)`.
    ///
    /// Returns the new stick vector, or `None` if `pointer_id` is not the
    /// tracked pointer.
    pub fn move_to(&mut self, pointer_id: PointerId, x: f32, y: f32) -> Option<StickVector> {
        let max_offset = self.geometry.max_offset;
        let session = self.session.as_mut().filter(|s| s.pointer_id == pointer_id)?;

        let (dx, dy) = clamp_offset(x - session.center.x, y - session.center.y, max_offset);
        session.offset = Point::new(dx, dy);
        let offset = session.offset;

        let vector = self.normalized(offset);
        trace!("Pointer {:?} -> ({:.3}, {:.3})", pointer_id, vector.x, vector.y);
        Some(vector)
    }

    /// Ends the gesture of `pointer_id` (release or cancel).
    ///
    /// Returns the neutral vector when the pointer was tracked, `None`
    /// otherwise.
    pub fn end(&mut self, pointer_id: PointerId) -> Option<StickVector> {
        match self.session {
            Some(s) if s.pointer_id == pointer_id => {
                self.session = None;
                Some(StickVector::ZERO)
            }
            _ => None,
        }
    }

    /// Normalizes an offset to the unit disk, flipping y so "up" is positive.
    fn normalized(&self, offset: Point) -> StickVector {
        let max_offset = self.geometry.max_offset;
        if max_offset <= 0.0 {
            return StickVector::ZERO;
        }
        StickVector::new(offset.x / max_offset, -offset.y / max_offset)
    }
}

/// Caps the length of `(dx, dy)` at `max_offset`, preserving direction.
///
/// # Examples
///
/// ```
/// use touch_gamepad::input::pointer::clamp_offset;
///
/// assert_eq!(clamp_offset(80.0, 0.0, 50.0), (50.0, 0.0));
/// assert_eq!(clamp_offset(30.0, 40.0, 50.0), (30.0, 40.0));
/// ```
#[must_use]
pub fn clamp_offset(dx: f32, dy: f32, max_offset: f32) -> (f32, f32) {
    let distance = dx.hypot(dy);
    if distance > max_offset {
        if max_offset <= 0.0 {
            return (0.0, 0.0);
        }
        let scale = max_offset / distance;
        (dx * scale, dy * scale)
    } else {
        (dx, dy)
    }
}
