//! Hit-testing against strokes and overlay items.
//!
//! Overlay items (attachments, text, images) sit above the drawing surface and
//! are tested first. Strokes are tested topmost first: a fill pass over
//! closed shapes, then a proximity pass over every stroke point.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::consts::HIT_RADIUS;
use crate::doc::{ItemRef, Note, ObjectId, ShapeKind, Stroke};
use crate::geometry::{self, Rect};

/// Which strategies [`find_object_at`] may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    /// Fill-area containment for closed shapes, then stroke proximity.
    Select,
    /// Stroke proximity only.
    Draw,
}

/// Which part of an overlay item was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    /// The bottom-right resize handle of a text box or image.
    ResizeHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub item: ItemRef,
    pub part: HitPart,
}

impl Hit {
    fn body(item: ItemRef) -> Self {
        Self { item, part: HitPart::Body }
    }
}

/// The object id of the topmost stroke object at `p`, if any.
#[must_use]
pub fn find_object_at(note: &Note, p: Point, mode: HitMode) -> Option<ObjectId> {
    if mode == HitMode::Select {
        if let Some(line) = note.lines.iter().rev().find(|l| fill_contains(l, p)) {
            return Some(line.object_id.clone());
        }
    }
    note.lines
        .iter()
        .rev()
        .find(|l| geometry::near_any_point(p, &l.points, HIT_RADIUS + l.width * 0.5))
        .map(|l| l.object_id.clone())
}

fn fill_contains(line: &Stroke, p: Point) -> bool {
    let kind = line.kind();
    if !kind.is_closed() || !geometry::is_closed(&line.points) {
        return false;
    }
    match kind {
        ShapeKind::Circle => line.bounds().is_some_and(|b| geometry::point_in_ellipse(p, &b)),
        _ => geometry::point_in_polygon(p, &line.points[..line.points.len() - 1]),
    }
}

/// Distinct object ids having at least one point inside `rect`, in draw order.
#[must_use]
pub fn objects_in_rect(note: &Note, rect: &Rect) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = Vec::new();
    for line in &note.lines {
        if !ids.contains(&line.object_id) && line.points.iter().any(|&q| rect.contains(q)) {
            ids.push(line.object_id.clone());
        }
    }
    ids
}

/// Test the overlay layer at `p`, topmost first.
///
/// `handle_radius` is the resize handle slop already converted to document
/// space.
#[must_use]
pub fn hit_overlay(note: &Note, p: Point, handle_radius: f64) -> Option<Hit> {
    if let Some(a) = note.attachments.iter().rev().find(|a| a.bounds().contains(p)) {
        return Some(Hit::body(ItemRef::Attachment(a.id.clone())));
    }
    for item in note.text_items.iter().rev() {
        if let Some(part) = boxed_part(&item.bounds(), p, handle_radius) {
            return Some(Hit { item: ItemRef::Text(item.id.clone()), part });
        }
    }
    for image in note.images.iter().rev() {
        if let Some(part) = boxed_part(&image.bounds(), p, handle_radius) {
            return Some(Hit { item: ItemRef::Image(image.id.clone()), part });
        }
    }
    None
}

fn boxed_part(bounds: &Rect, p: Point, handle_radius: f64) -> Option<HitPart> {
    let corner = Point::new(bounds.max_x, bounds.max_y);
    if corner.distance(p) <= handle_radius {
        Some(HitPart::ResizeHandle)
    } else if bounds.contains(p) {
        Some(HitPart::Body)
    } else {
        None
    }
}

/// Full hit test: overlay first, then stroke objects.
#[must_use]
pub fn hit_test(note: &Note, p: Point, mode: HitMode, handle_radius: f64) -> Option<Hit> {
    hit_overlay(note, p, handle_radius)
        .or_else(|| find_object_at(note, p, mode).map(|id| Hit::body(ItemRef::Object(id))))
}
