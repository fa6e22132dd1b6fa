//! View transform: zoom, pan, rotation, and the freeze lock.
//!
//! The shell applies one combined transform to both the drawing surface and
//! the overlay layer, pivoting on the viewport centre:
//!
//! ```text
//! screen = centre + pan + zoom * R(rotation) * (doc - centre)
//! ```
//!
//! All stored geometry lives in document space, so pointer input goes through
//! [`Camera::screen_to_world`] before it touches the document.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

/// A point in either screen or document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// This point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Visible size of the canvas element in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether the viewport has no visible area yet (before the first layout).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    /// Clamp a screen point into the visible bounds. An empty viewport clamps nothing.
    #[must_use]
    pub fn clamp(&self, p: Point) -> Point {
        if self.is_empty() {
            return p;
        }
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}

/// Zoom/pan/rotation state for the canvas.
///
/// `pan_x` / `pan_y` are in CSS pixels, `zoom` is a scale factor in
/// `[MIN_ZOOM, MAX_ZOOM]` and `rotation` is in degrees (unbounded).
/// While `frozen` is set every mutator is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    #[serde(rename = "zoomLevel")]
    pub zoom: f64,
    #[serde(rename = "panX")]
    pub pan_x: f64,
    #[serde(rename = "panY")]
    pub pan_y: f64,
    pub rotation: f64,
    pub frozen: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self { zoom: 1.0, pan_x: 0.0, pan_y: 0.0, rotation: 0.0, frozen: false }
    }
}

fn differs(a: f64, b: f64) -> bool {
    (a - b).abs() > f64::EPSILON
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

impl Camera {
    /// Repair values read from untrusted storage: non-finite fields fall back
    /// to the identity transform and zoom is clamped into range.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            zoom: finite_or(self.zoom, 1.0).clamp(MIN_ZOOM, MAX_ZOOM),
            pan_x: finite_or(self.pan_x, 0.0),
            pan_y: finite_or(self.pan_y, 0.0),
            rotation: finite_or(self.rotation, 0.0),
            frozen: self.frozen,
        }
    }

    /// Convert a screen-space point (CSS pixels, canvas-local) to document coordinates.
    ///
    /// The point is first clamped to the visible bounds.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, viewport: Viewport) -> Point {
        let screen = viewport.clamp(screen);
        let c = viewport.center();
        let dx = (screen.x - c.x - self.pan_x) / self.zoom;
        let dy = (screen.y - c.y - self.pan_y) / self.zoom;
        let (sin, cos) = (-self.rotation.to_radians()).sin_cos();
        Point::new(c.x + dx * cos - dy * sin, c.y + dx * sin + dy * cos)
    }

    /// Convert a document point to screen coordinates (CSS pixels, canvas-local).
    #[must_use]
    pub fn world_to_screen(&self, world: Point, viewport: Viewport) -> Point {
        let c = viewport.center();
        let dx = world.x - c.x;
        let dy = world.y - c.y;
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        Point::new(
            c.x + self.pan_x + self.zoom * (dx * cos - dy * sin),
            c.y + self.pan_y + self.zoom * (dx * sin + dy * cos),
        )
    }

    /// Convert a screen-space distance (pixels) to document-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Scale applied to overlay elements so they keep their on-screen size under zoom.
    #[must_use]
    pub fn counter_scale(&self) -> f64 {
        1.0 / self.zoom
    }

    /// The combined transform applied to the drawing surface and overlay layer.
    #[must_use]
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}) rotate({}deg)",
            self.pan_x, self.pan_y, self.zoom, self.rotation
        )
    }

    /// Set the zoom factor, clamped into range. Returns whether anything changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if self.frozen || !zoom.is_finite() {
            return false;
        }
        let next = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let changed = differs(next, self.zoom);
        self.zoom = next;
        changed
    }

    /// Adjust the zoom factor by `delta`, clamped.
    pub fn zoom_by(&mut self, delta: f64) -> bool {
        self.set_zoom(self.zoom + delta)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_by(-ZOOM_STEP)
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.set_zoom(1.0)
    }

    /// Accumulate a pan delta in screen pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        if self.frozen || (!differs(dx, 0.0) && !differs(dy, 0.0)) {
            return false;
        }
        self.pan_x += dx;
        self.pan_y += dy;
        true
    }

    pub fn set_rotation(&mut self, degrees: f64) -> bool {
        if self.frozen || !degrees.is_finite() {
            return false;
        }
        let changed = differs(degrees, self.rotation);
        self.rotation = degrees;
        changed
    }

    /// Zero pan and rotation and set zoom to 1 in one step.
    pub fn reset(&mut self) -> bool {
        if self.frozen {
            return false;
        }
        let next = Self { frozen: false, ..Self::default() };
        let changed = *self != next;
        *self = next;
        changed
    }

    /// Flip the freeze lock and return the new state.
    pub fn toggle_frozen(&mut self) -> bool {
        self.frozen = !self.frozen;
        self.frozen
    }
}
