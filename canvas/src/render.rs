//! Rendering: builds a display list for the current frame.
//!
//! The engine does not rasterise. [`build_scene`] reads document, camera, and
//! UI state and produces a [`Scene`] that the shell paints (canvas strokes for
//! the drawing layer, positioned elements for the overlay layer). It does not
//! mutate any application state.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde::Serialize;

use crate::camera::Point;
use crate::consts::{HANDLE_RADIUS_PX, MULTI_SELECTION_COLOR, SELECTION_PADDING, SINGLE_SELECTION_COLOR};
use crate::doc::{ItemRef, Note, Stroke};
use crate::engine::EngineCore;
use crate::geometry::Rect;
use crate::input::Selection;

/// Dashed outline around a selected stroke object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub object_id: String,
    /// Object bounds padded by the selection padding.
    pub bounds: Rect,
    pub color: &'static str,
}

/// One positioned element of the overlay layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayBox {
    pub item: ItemRef,
    pub bounds: Rect,
    pub selected: bool,
    /// The text editor inside this box has focus.
    pub editing: bool,
    /// Resize handle centre and radius in document units, when one is shown.
    pub handle: Option<(Point, f64)>,
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// CSS transform shared by the drawing surface and the overlay layer.
    pub transform: String,
    /// Scale applied to overlay chrome so it keeps its on-screen size.
    pub counter_scale: f64,
    pub opacity: f64,
    pub frozen: bool,
    /// Zoom percentage label, when the zoom controls are shown.
    pub zoom_label: Option<String>,
    /// Note origin reference dot.
    pub origin: Point,
    pub strokes: Vec<Stroke>,
    /// The stroke or shape being drawn.
    pub preview: Option<Stroke>,
    pub highlights: Vec<Highlight>,
    pub marquee: Option<Rect>,
    pub overlay: Vec<OverlayBox>,
    /// Screen position of the paste overlay.
    pub paste_overlay: Option<Point>,
}

/// Build the display list for the engine's current state.
#[must_use]
pub fn build_scene(engine: &EngineCore) -> Scene {
    let camera = engine.camera();
    let note = engine.note();
    let selection = engine.selection();

    // Layer 1: committed strokes in draw order, then the live preview.
    let strokes = note.lines.clone();
    let preview = engine.preview_stroke();

    // Layer 2: selection chrome.
    let highlights = highlights(note, selection);
    let marquee = engine.marquee_rect();

    // Layer 3: overlay elements.
    let handle_radius = camera.screen_dist_to_world(HANDLE_RADIUS_PX);
    let overlay = overlay_boxes(note, selection, engine.ui.editing_text.as_deref(), handle_radius);

    Scene {
        transform: camera.css_transform(),
        counter_scale: camera.counter_scale(),
        opacity: engine.settings.opacity(engine.ui.focused),
        frozen: camera.frozen,
        zoom_label: engine.settings.show_zoom_controls.then(|| zoom_label(camera.zoom)),
        origin: note.origin(),
        strokes,
        preview,
        highlights,
        marquee,
        overlay,
        paste_overlay: engine.ui.paste_overlay,
    }
}

/// Zoom as a whole percentage, e.g. `"125%"`.
#[must_use]
pub fn zoom_label(zoom: f64) -> String {
    format!("{:.0}%", zoom * 100.0)
}

fn highlights(note: &Note, selection: &Selection) -> Vec<Highlight> {
    let color = if selection.is_multi() { MULTI_SELECTION_COLOR } else { SINGLE_SELECTION_COLOR };
    selection
        .items()
        .into_iter()
        .filter_map(|item| match item {
            ItemRef::Object(id) => note
                .object_bounds(&id)
                .map(|b| Highlight { object_id: id, bounds: b.padded(SELECTION_PADDING), color }),
            _ => None,
        })
        .collect()
}

fn overlay_boxes(note: &Note, selection: &Selection, editing: Option<&str>, handle_radius: f64) -> Vec<OverlayBox> {
    let resizable = note
        .text_items
        .iter()
        .map(|t| (ItemRef::Text(t.id.clone()), t.bounds()))
        .chain(note.images.iter().map(|i| (ItemRef::Image(i.id.clone()), i.bounds())));
    let fixed = note.attachments.iter().map(|a| (ItemRef::Attachment(a.id.clone()), a.bounds()));

    let mut boxes: Vec<OverlayBox> = resizable
        .map(|(item, bounds)| {
            let selected = selection.contains(&item);
            let handle = selected.then(|| (Point::new(bounds.max_x, bounds.max_y), handle_radius));
            let editing = matches!(&item, ItemRef::Text(id) if editing == Some(id.as_str()));
            OverlayBox { item, bounds, selected, editing, handle }
        })
        .collect();
    boxes.extend(fixed.map(|(item, bounds)| OverlayBox {
        selected: selection.contains(&item),
        item,
        bounds,
        editing: false,
        handle: None,
    }));
    boxes
}
