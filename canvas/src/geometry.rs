//! Pure geometry: bounding boxes, containment tests, and shape vertex synthesis.
//!
//! Nothing here holds state. Hit-testing in [`crate::hit`] and shape drawing in
//! [`crate::engine`] are both built on these functions.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::Serialize;

use crate::camera::Point;
use crate::consts::{ARROW_HEAD_ANGLE, ARROW_HEAD_MAX, ARROW_HEAD_RATIO, ELLIPSE_SEGMENTS};
use crate::doc::ShapeKind;

/// Coordinates closer than this are treated as the same vertex.
const VERTEX_EPSILON: f64 = 1e-6;

/// Axis-aligned rectangle in document space. `min_*` never exceeds `max_*`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Normalised rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self { min_x: a.x.min(b.x), min_y: a.y.min(b.y), max_x: a.x.max(b.x), max_y: a.y.max(b.y) }
    }

    /// Rectangle at `(x, y)` with the given size.
    #[must_use]
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(Point::new(x, y), Point::new(x + width, y + height))
    }

    /// Tightest box around `points`, or `None` when there are none.
    pub fn bounding<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        for p in iter {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    /// Smallest box containing both rectangles.
    #[must_use]
    pub fn union(self, other: Rect) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Inclusive containment.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    /// Grow the rectangle by `pad` on every side.
    #[must_use]
    pub fn padded(&self, pad: f64) -> Self {
        Self { min_x: self.min_x - pad, min_y: self.min_y - pad, max_x: self.max_x + pad, max_y: self.max_y + pad }
    }
}

fn same_vertex(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < VERTEX_EPSILON && (a.y - b.y).abs() < VERTEX_EPSILON
}

/// Whether a polyline ends where it starts.
#[must_use]
pub fn is_closed(points: &[Point]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 2 => same_vertex(*first, *last),
        _ => false,
    }
}

/// Even-odd ray-casting containment. `vertices` must not repeat the first vertex at the end.
#[must_use]
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let cross_x = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether `p` lies inside the ellipse inscribed in `bounds`.
///
/// A zero-width or zero-height box contains nothing.
#[must_use]
pub fn point_in_ellipse(p: Point, bounds: &Rect) -> bool {
    let rx = bounds.width() * 0.5;
    let ry = bounds.height() * 0.5;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let c = bounds.center();
    let nx = (p.x - c.x) / rx;
    let ny = (p.y - c.y) / ry;
    nx * nx + ny * ny <= 1.0
}

/// Whether any of `points` lies strictly within `tolerance` of `p`.
#[must_use]
pub fn near_any_point(p: Point, points: &[Point], tolerance: f64) -> bool {
    points.iter().any(|q| q.distance(p) < tolerance)
}

/// Synthesize the vertices of a shape dragged from `start` to `end`.
///
/// Closed shapes repeat their first vertex at the end. `Freehand` has no
/// template and yields the two anchors, like `Line`.
#[must_use]
pub fn generate_shape_points(kind: ShapeKind, start: Point, end: Point) -> Vec<Point> {
    match kind {
        ShapeKind::Rectangle => rectangle_points(start, end),
        ShapeKind::Circle => ellipse_points(start, end),
        ShapeKind::Triangle => triangle_points(start, end),
        ShapeKind::Arrow => arrow_points(start, end),
        ShapeKind::Line | ShapeKind::Freehand => vec![start, end],
    }
}

fn rectangle_points(start: Point, end: Point) -> Vec<Point> {
    vec![
        start,
        Point::new(end.x, start.y),
        end,
        Point::new(start.x, end.y),
        start,
    ]
}

fn ellipse_points(start: Point, end: Point) -> Vec<Point> {
    let c = Point::new((start.x + end.x) * 0.5, (start.y + end.y) * 0.5);
    let rx = (end.x - start.x).abs() * 0.5;
    let ry = (end.y - start.y).abs() * 0.5;
    #[allow(clippy::cast_precision_loss)]
    let step = std::f64::consts::TAU / ELLIPSE_SEGMENTS as f64;
    let mut points: Vec<Point> = (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * i as f64;
            Point::new(c.x + rx * angle.cos(), c.y + ry * angle.sin())
        })
        .collect();
    points.push(points[0]);
    points
}

fn triangle_points(start: Point, end: Point) -> Vec<Point> {
    let b = Rect::from_corners(start, end);
    let apex = Point::new((b.min_x + b.max_x) * 0.5, b.min_y);
    vec![apex, Point::new(b.max_x, b.max_y), Point::new(b.min_x, b.max_y), apex]
}

fn arrow_points(start: Point, end: Point) -> Vec<Point> {
    let length = start.distance(end);
    if length <= 0.0 {
        return vec![start, end];
    }
    let head = ARROW_HEAD_MAX.min(length * ARROW_HEAD_RATIO);
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let wing = |theta: f64| Point::new(end.x - head * theta.cos(), end.y - head * theta.sin());
    vec![start, end, wing(angle - ARROW_HEAD_ANGLE), end, wing(angle + ARROW_HEAD_ANGLE)]
}

/// Best-effort shape kind for strokes saved before shapes carried a `tool` tag.
///
/// Classification is by vertex count and closure, so a freehand scribble with
/// a matching count can be misread. Returns `None` when nothing matches.
#[must_use]
pub fn infer_shape_kind(points: &[Point]) -> Option<ShapeKind> {
    let closed = is_closed(points);
    match points.len() {
        2 => Some(ShapeKind::Line),
        4 if closed => Some(ShapeKind::Triangle),
        5 if closed => Some(ShapeKind::Rectangle),
        5 if same_vertex(points[1], points[3]) => Some(ShapeKind::Arrow),
        n if closed && n == ELLIPSE_SEGMENTS + 1 => Some(ShapeKind::Circle),
        _ => None,
    }
}
