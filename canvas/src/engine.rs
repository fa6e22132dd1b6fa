//! The interaction engine.
//!
//! [`EngineCore`] owns the notebook, view transform, settings, history, and
//! clipboards, and turns input events into document edits. It never touches
//! the platform: every handler returns a list of [`Action`]s for the shell to
//! carry out (redraw, schedule a save, read the system clipboard, open a
//! file). Time is passed in as `now_ms` so behaviour is deterministic.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::{debug, info};

use crate::camera::{Camera, Point, Viewport};
use crate::clipboard::{self, ClipEntry, SystemClip};
use crate::consts::{
    DEFAULT_TEXT_HEIGHT, DEFAULT_TEXT_WIDTH, HANDLE_RADIUS_PX, MAX_PASTED_IMAGE_SIZE, PASTE_OFFSET, WHEEL_ZOOM_FACTOR,
};
use crate::doc::{Attachment, FormatMark, ImageItem, ItemRef, Note, ObjectId, ShapeKind, Stroke, TextItem};
use crate::geometry::{self, Rect};
use crate::hit::{self, Hit, HitMode, HitPart};
use crate::history::History;
use crate::ids::{IdGen, ObjectGrouper};
use crate::input::{Button, InputState, Key, Modifiers, Selection, Tool, UiState, WheelDelta};
use crate::notes::Notebook;
use crate::persist::{self, Loaded, Payload, Settings};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The scene changed and should be redrawn.
    RenderNeeded,
    /// Persisted state changed; (re)arm the debounced autosave.
    SaveRequested,
    /// The active note changed.
    NoteChanged { index: usize, count: usize },
    /// The active tool changed.
    ToolChanged(Tool),
    /// Show the system-clipboard paste overlay at a screen point.
    ShowPasteOverlay { at: Point },
    /// Hide the paste overlay.
    HidePasteOverlay,
    /// The user asked to paste; read the system clipboard and call
    /// [`EngineCore::smart_paste`].
    PasteRequested,
    /// Hand this path to the OS default opener.
    OpenFile(String),
    /// Give keyboard focus to this text item's editor.
    FocusText { id: String },
    /// Background opacity for the current focus state.
    OpacityChanged(f64),
}

/// Zoom and rotation captured when a platform gesture starts.
#[derive(Debug, Clone, Copy)]
struct GestureStart {
    zoom: f64,
    rotation: f64,
}

/// Core engine state: all interaction logic, free of platform dependencies.
pub struct EngineCore {
    pub notebook: Notebook,
    pub camera: Camera,
    pub settings: Settings,
    pub ui: UiState,
    pub input: InputState,
    pub viewport: Viewport,
    history: History,
    ids: IdGen,
    grouper: ObjectGrouper,
    clipboard: Option<ClipEntry>,
    system_clip: Option<SystemClip>,
    gesture: Option<GestureStart>,
    /// Content of the edited text item when editing began.
    edit_origin: Option<String>,
}

impl EngineCore {
    /// A fresh engine with one empty note.
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        let mut ids = IdGen::new();
        let first = Note::new(&ids.mint(now_ms), Point::default(), now_ms);
        let notebook = Notebook::new(first);
        let mut history = History::default();
        history.reset(notebook.current());
        Self {
            notebook,
            camera: Camera::default(),
            settings: Settings::default(),
            ui: UiState::default(),
            input: InputState::Idle,
            viewport: Viewport::default(),
            history,
            ids,
            grouper: ObjectGrouper::new(),
            clipboard: None,
            system_clip: None,
            gesture: None,
            edit_origin: None,
        }
    }

    // --- Data ---

    /// Replace the session with a decoded payload.
    pub fn load(&mut self, loaded: Loaded, now_ms: i64) -> Vec<Action> {
        let migrated = loaded.migrated;
        for note in &loaded.notes {
            observe_note_ids(&mut self.ids, note);
        }
        let origin = self.world_center();
        let ids = &mut self.ids;
        let restored = persist::restore(loaded, || Note::new(&ids.mint(now_ms), origin, now_ms));
        self.notebook = restored.notebook;
        self.camera = restored.camera;
        self.settings = restored.settings;
        info!(
            notes = self.notebook.len(),
            index = self.notebook.current_index(),
            migrated,
            clean_slate = restored.clean_slate,
            "loaded notebook"
        );
        let mut actions = self.after_note_switch();
        if !(migrated || restored.clean_slate) {
            actions.retain(|a| *a != Action::SaveRequested);
        }
        actions.push(Action::OpacityChanged(self.settings.opacity(self.ui.focused)));
        actions
    }

    /// The state to persist.
    #[must_use]
    pub fn payload(&self) -> Payload<'_> {
        Payload {
            notes: self.notebook.notes(),
            current_note_index: self.notebook.current_index(),
            settings: &self.settings,
            transform: self.camera,
        }
    }

    /// Update the visible canvas size in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport = Viewport::new(width, height);
        vec![Action::RenderNeeded]
    }

    pub fn update_settings(&mut self, settings: Settings) -> Vec<Action> {
        self.settings = settings;
        vec![
            Action::OpacityChanged(self.settings.opacity(self.ui.focused)),
            Action::RenderNeeded,
            Action::SaveRequested,
        ]
    }

    // --- Queries ---

    #[must_use]
    pub fn note(&self) -> &Note {
        self.notebook.current()
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.ui.selection
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn clipboard(&self) -> Option<&ClipEntry> {
        self.clipboard.as_ref()
    }

    #[must_use]
    pub fn system_clip(&self) -> Option<&SystemClip> {
        self.system_clip.as_ref()
    }

    /// The uncommitted stroke or shape preview, if a draw gesture is active.
    #[must_use]
    pub fn preview_stroke(&self) -> Option<Stroke> {
        match &self.input {
            InputState::Drawing { object_id, points } => Some(Stroke::new(
                points.clone(),
                &self.ui.color,
                self.ui.stroke_width,
                object_id,
                Some(ShapeKind::Freehand),
            )),
            InputState::DrawingShape { kind, start, current } => Some(Stroke::new(
                geometry::generate_shape_points(*kind, *start, *current),
                &self.ui.color,
                self.ui.stroke_width,
                "",
                Some(*kind),
            )),
            _ => None,
        }
    }

    /// The rubber-band rectangle, if a marquee is active.
    #[must_use]
    pub fn marquee_rect(&self) -> Option<Rect> {
        match &self.input {
            InputState::Marquee { start, current } => Some(Rect::from_corners(*start, *current)),
            _ => None,
        }
    }

    fn world_center(&self) -> Point {
        self.camera.screen_to_world(self.viewport.center(), self.viewport)
    }

    fn to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen, self.viewport)
    }

    // --- Tool / style ---

    pub fn set_tool(&mut self, tool: Tool, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        self.input = InputState::Idle;
        self.ui.tool = tool;
        if tool != Tool::Select {
            self.ui.selection = Selection::None;
        }
        actions.push(Action::ToolChanged(tool));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Set the drawing colour; a non-empty selection is recoloured too.
    pub fn set_color(&mut self, color: &str, now_ms: i64) -> Vec<Action> {
        self.ui.color = color.to_owned();
        let mut changed = false;
        let items = self.ui.selection.items();
        let note = self.notebook.current_mut();
        for item in &items {
            changed |= note.recolor_item(item, color);
        }
        if let Some(id) = self.ui.editing_text.clone() {
            if !self.ui.selection.contains(&ItemRef::Text(id.clone())) {
                changed |= self.notebook.current_mut().recolor_text(&id, color);
            }
        }
        let mut actions = vec![Action::RenderNeeded];
        if changed {
            self.commit(now_ms, &mut actions);
        }
        actions
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.ui.stroke_width = width;
        }
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers, now_ms: i64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.ui.paste_overlay.take().is_some() {
            actions.push(Action::HidePasteOverlay);
        }
        match button {
            Button::Middle => {
                if self.settings.pan && !self.camera.frozen {
                    self.input = InputState::Panning { last_screen: screen };
                }
                return actions;
            }
            Button::Secondary => return actions,
            Button::Primary => {}
        }

        let world = self.to_world(screen);
        let handle_radius = self.camera.screen_dist_to_world(HANDLE_RADIUS_PX);
        let mode = if self.ui.tool.draws() { HitMode::Draw } else { HitMode::Select };
        let hit = if self.ui.tool == Tool::Text {
            hit::hit_overlay(self.note(), world, handle_radius)
        } else {
            hit::hit_test(self.note(), world, mode, handle_radius)
        };

        let editing = self.ui.editing_text.clone().map(ItemRef::Text);
        if editing.is_some() && hit.as_ref().map(|h| &h.item) != editing.as_ref() {
            actions.extend(self.end_text_edit(now_ms));
        }

        if let Some(hit) = hit {
            self.begin_item_gesture(hit, world, &mut actions);
            actions.push(Action::RenderNeeded);
            return actions;
        }

        match self.ui.tool {
            Tool::Text => {
                let id = self.ids.mint(now_ms);
                let item = TextItem::new(&id, world, "", &self.ui.color);
                self.notebook.current_mut().add_text(item);
                self.ui.selection = Selection::Single(ItemRef::Text(id.clone()));
                actions.extend(self.begin_text_edit(&id));
            }
            Tool::Select => {
                self.ui.selection = Selection::None;
                self.input = InputState::Marquee { start: world, current: world };
            }
            Tool::Draw => {
                self.ui.selection = Selection::None;
                let object_id = self.grouper.stroke_id(now_ms, &mut self.ids);
                self.input = InputState::Drawing { object_id, points: vec![world] };
            }
            Tool::Shape(kind) => {
                self.ui.selection = Selection::None;
                self.input = InputState::DrawingShape { kind, start: world, current: world };
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn begin_item_gesture(&mut self, hit: Hit, world: Point, actions: &mut Vec<Action>) {
        if hit.part == HitPart::ResizeHandle {
            let size = match &hit.item {
                ItemRef::Text(id) => self.note().text(id).map(|t| {
                    (t.width.unwrap_or(DEFAULT_TEXT_WIDTH), t.height.unwrap_or(DEFAULT_TEXT_HEIGHT))
                }),
                ItemRef::Image(id) => self.note().image(id).map(|i| (i.width, i.height)),
                ItemRef::Object(_) | ItemRef::Attachment(_) => None,
            };
            if let Some((orig_w, orig_h)) = size {
                self.ui.selection = Selection::Single(hit.item.clone());
                self.input = InputState::Resizing { item: hit.item, start_world: world, orig_w, orig_h };
                return;
            }
        }

        let items = if self.ui.selection.is_multi() && self.ui.selection.contains(&hit.item) {
            self.ui.selection.items()
        } else {
            self.ui.selection = Selection::Single(hit.item.clone());
            vec![hit.item.clone()]
        };
        if self.ui.tool == Tool::Text {
            if let ItemRef::Text(id) = &hit.item {
                if self.ui.editing_text.as_deref() != Some(id.as_str()) {
                    actions.extend(self.begin_text_edit(id));
                }
            }
        }
        self.input = InputState::DraggingItems { items, last_world: world, moved: false };
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers, _now_ms: i64) -> Vec<Action> {
        let world = self.to_world(screen);
        let mut input = std::mem::take(&mut self.input);
        let changed = match &mut input {
            InputState::Idle => false,
            InputState::Panning { last_screen } => {
                let moved = self.camera.pan_by(screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                moved
            }
            InputState::Drawing { points, .. } => {
                points.push(world);
                true
            }
            InputState::DrawingShape { current, .. } | InputState::Marquee { current, .. } => {
                *current = world;
                true
            }
            InputState::DraggingItems { items, last_world, moved } => {
                let (dx, dy) = (world.x - last_world.x, world.y - last_world.y);
                *last_world = world;
                if dx == 0.0 && dy == 0.0 {
                    false
                } else {
                    let note = self.notebook.current_mut();
                    for item in items.iter() {
                        *moved |= note.move_item(item, dx, dy);
                    }
                    true
                }
            }
            InputState::Resizing { item, start_world, orig_w, orig_h } => {
                let (dx, dy) = (world.x - start_world.x, world.y - start_world.y);
                let note = self.notebook.current_mut();
                match item {
                    ItemRef::Text(id) => note.resize_text(id, *orig_w + dx, *orig_h + dy),
                    ItemRef::Image(id) => {
                        let scale = (dx / *orig_w).max(dy / *orig_h);
                        note.resize_image(id, *orig_w * (1.0 + scale), *orig_h * (1.0 + scale))
                    }
                    ItemRef::Object(_) | ItemRef::Attachment(_) => false,
                }
            }
        };
        self.input = input;
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    pub fn on_pointer_up(&mut self, screen: Point, _button: Button, _modifiers: Modifiers, now_ms: i64) -> Vec<Action> {
        let input = std::mem::take(&mut self.input);
        let mut actions = Vec::new();
        match input {
            InputState::Idle => return actions,
            InputState::Panning { .. } => actions.push(Action::SaveRequested),
            InputState::Drawing { object_id, points } => {
                let stroke = Stroke::new(
                    points,
                    &self.ui.color,
                    self.ui.stroke_width,
                    &object_id,
                    Some(ShapeKind::Freehand),
                );
                if self.notebook.current_mut().add_stroke(stroke) {
                    self.commit(now_ms, &mut actions);
                }
            }
            InputState::DrawingShape { kind, start, current } => {
                if start != current {
                    let points = geometry::generate_shape_points(kind, start, current);
                    let object_id = self.ids.mint(now_ms);
                    self.grouper.reset();
                    let stroke = Stroke::new(points, &self.ui.color, self.ui.stroke_width, &object_id, Some(kind));
                    if self.notebook.current_mut().add_stroke(stroke) {
                        self.commit(now_ms, &mut actions);
                    }
                }
            }
            InputState::DraggingItems { moved, .. } => {
                if moved {
                    self.commit(now_ms, &mut actions);
                }
            }
            InputState::Resizing { item, orig_w, orig_h, .. } => {
                let size = match &item {
                    ItemRef::Text(id) => self.note().text(id).map(|t| (t.width, t.height)),
                    ItemRef::Image(id) => self.note().image(id).map(|i| (Some(i.width), Some(i.height))),
                    ItemRef::Object(_) | ItemRef::Attachment(_) => None,
                };
                if let Some((w, h)) = size {
                    if w.is_some_and(|w| w != orig_w) || h.is_some_and(|h| h != orig_h) {
                        self.commit(now_ms, &mut actions);
                    }
                }
            }
            InputState::Marquee { start, current } => {
                if start == current {
                    self.ui.selection = Selection::None;
                    if self.system_clip.is_some() {
                        self.ui.paste_overlay = Some(screen);
                        actions.push(Action::ShowPasteOverlay { at: screen });
                    }
                } else {
                    let rect = Rect::from_corners(start, current);
                    let ids = hit::objects_in_rect(self.note(), &rect);
                    debug!(count = ids.len(), "marquee selection");
                    self.ui.selection = Selection::from_items(ids.into_iter().map(ItemRef::Object).collect());
                }
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Double-click: open an attachment, edit a text item, or reset the view.
    pub fn on_double_click(&mut self, screen: Point, _now_ms: i64) -> Vec<Action> {
        let world = self.to_world(screen);
        match hit::hit_overlay(self.note(), world, 0.0).map(|h| h.item) {
            Some(ItemRef::Attachment(id)) => self.open_attachment(&id),
            Some(ItemRef::Text(id)) => {
                self.ui.selection = Selection::Single(ItemRef::Text(id.clone()));
                self.begin_text_edit(&id)
            }
            _ => self.reset_transform(),
        }
    }

    // --- View transform ---

    pub fn on_wheel(&mut self, _screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        let changed = if modifiers.ctrl {
            self.settings.pinch_zoom && self.camera.zoom_by(-delta.dy * WHEEL_ZOOM_FACTOR)
        } else if self.settings.pan && !modifiers.meta {
            if matches!(self.input, InputState::Drawing { .. } | InputState::DrawingShape { .. }) {
                return Vec::new();
            }
            self.camera.pan_by(-delta.dx, -delta.dy)
        } else {
            false
        };
        transform_actions(changed)
    }

    pub fn on_gesture_start(&mut self) {
        self.gesture = Some(GestureStart { zoom: self.camera.zoom, rotation: self.camera.rotation });
    }

    /// Platform pinch/rotate update, relative to the gesture start.
    pub fn on_gesture_change(&mut self, scale: f64, rotation: f64) -> Vec<Action> {
        let Some(start) = self.gesture else {
            return Vec::new();
        };
        let mut changed = false;
        if self.settings.pinch_zoom {
            changed |= self.camera.set_zoom(start.zoom * scale);
        }
        if self.settings.rotate {
            changed |= self.camera.set_rotation(start.rotation + rotation);
        }
        transform_actions(changed)
    }

    pub fn on_gesture_end(&mut self) {
        self.gesture = None;
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let changed = self.camera.zoom_in();
        transform_actions(changed)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let changed = self.camera.zoom_out();
        transform_actions(changed)
    }

    pub fn reset_zoom(&mut self) -> Vec<Action> {
        let changed = self.camera.reset_zoom();
        transform_actions(changed)
    }

    /// Zoom 1, no pan, no rotation, in one step.
    pub fn reset_transform(&mut self) -> Vec<Action> {
        let changed = self.camera.reset();
        transform_actions(changed)
    }

    pub fn toggle_freeze(&mut self) -> Vec<Action> {
        let frozen = self.camera.toggle_frozen();
        debug!(frozen, "view freeze toggled");
        vec![Action::RenderNeeded, Action::SaveRequested]
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers, now_ms: i64) -> Vec<Action> {
        if self.ui.editing_text.is_some() {
            if key.is("Escape") {
                return self.clear_selection(now_ms);
            }
            return Vec::new();
        }

        if modifiers.command() {
            return match key.0.as_str() {
                k if k.eq_ignore_ascii_case("z") && modifiers.shift => self.redo(now_ms),
                k if k.eq_ignore_ascii_case("z") => self.undo(now_ms),
                k if k.eq_ignore_ascii_case("y") => self.redo(now_ms),
                k if k.eq_ignore_ascii_case("c") => {
                    self.copy_selection();
                    Vec::new()
                }
                k if k.eq_ignore_ascii_case("v") => vec![Action::PasteRequested],
                k if k.eq_ignore_ascii_case("a") => self.select_all(),
                "=" | "+" => self.zoom_in(),
                "-" => self.zoom_out(),
                "0" => self.reset_zoom(),
                _ => Vec::new(),
            };
        }

        match key.0.as_str() {
            "Delete" | "Backspace" => return self.delete_selection(now_ms),
            "Escape" => return self.clear_selection(now_ms),
            "[" => return self.previous_note(now_ms),
            "]" => return self.next_note(now_ms),
            _ => {}
        }
        if modifiers.any() {
            return Vec::new();
        }
        let tool = match key.0.as_str() {
            "d" | "D" => return self.delete_selection(now_ms),
            "v" | "V" => Tool::Select,
            "b" | "B" => Tool::Draw,
            "t" | "T" => Tool::Text,
            "r" | "R" => Tool::Shape(ShapeKind::Rectangle),
            "o" | "O" => Tool::Shape(ShapeKind::Circle),
            "l" | "L" => Tool::Shape(ShapeKind::Line),
            "a" | "A" => Tool::Shape(ShapeKind::Arrow),
            _ => return Vec::new(),
        };
        self.set_tool(tool, now_ms)
    }

    // --- Selection ---

    pub fn select_all(&mut self) -> Vec<Action> {
        self.ui.selection = Selection::from_items(self.note().all_items());
        vec![Action::RenderNeeded]
    }

    /// Drop the selection, end text editing, and hide the paste overlay.
    pub fn clear_selection(&mut self, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        self.ui.selection = Selection::None;
        if self.ui.paste_overlay.take().is_some() {
            actions.push(Action::HidePasteOverlay);
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Delete every selected item as one edit.
    pub fn delete_selection(&mut self, now_ms: i64) -> Vec<Action> {
        let items = std::mem::take(&mut self.ui.selection).items();
        if let Some(editing) = &self.ui.editing_text {
            if items.contains(&ItemRef::Text(editing.clone())) {
                self.ui.editing_text = None;
                self.edit_origin = None;
            }
        }
        let note = self.notebook.current_mut();
        let mut removed = false;
        for item in &items {
            removed |= note.remove_item(item);
        }
        let mut actions = vec![Action::RenderNeeded];
        if removed {
            self.commit(now_ms, &mut actions);
        }
        actions
    }

    /// Remove every stroke, text item, image, and attachment from the active note.
    pub fn clear_note(&mut self, now_ms: i64) -> Vec<Action> {
        self.ui.editing_text = None;
        self.edit_origin = None;
        self.ui.selection = Selection::None;
        self.input = InputState::Idle;
        let mut actions = vec![Action::RenderNeeded];
        if self.notebook.current_mut().clear() {
            self.commit(now_ms, &mut actions);
        }
        actions
    }

    // --- Text ---

    /// Start editing a text item.
    pub fn begin_text_edit(&mut self, id: &str) -> Vec<Action> {
        let Some(item) = self.note().text(id) else {
            return Vec::new();
        };
        self.edit_origin = Some(item.content.clone());
        self.ui.editing_text = Some(id.to_owned());
        vec![Action::FocusText { id: id.to_owned() }, Action::RenderNeeded]
    }

    /// Replace a text item's content (one call per keystroke).
    pub fn set_text_content(&mut self, id: &str, content: &str, now_ms: i64) -> Vec<Action> {
        let note = self.notebook.current_mut();
        if !note.set_text_content(id, content) {
            return Vec::new();
        }
        note.touch(now_ms);
        vec![Action::SaveRequested]
    }

    /// Finish editing. Blank items are deleted; changed ones become one history entry.
    pub fn end_text_edit(&mut self, now_ms: i64) -> Vec<Action> {
        let Some(id) = self.ui.editing_text.take() else {
            return Vec::new();
        };
        let origin = self.edit_origin.take().unwrap_or_default();
        let mut actions = vec![Action::RenderNeeded];
        let blank = self.note().text(&id).is_none_or(TextItem::is_blank);
        if blank {
            self.notebook.current_mut().remove_text(&id);
            self.ui.selection.remove(&ItemRef::Text(id));
            if !origin.is_empty() {
                self.commit(now_ms, &mut actions);
            } else {
                actions.push(Action::SaveRequested);
            }
        } else if self.note().text(&id).is_some_and(|t| t.content != origin) {
            self.commit(now_ms, &mut actions);
        }
        actions
    }

    /// Flip a format mark on the edited text item, or the selected one.
    pub fn toggle_text_format(&mut self, mark: FormatMark, now_ms: i64) -> Vec<Action> {
        let target = self.ui.editing_text.clone().or_else(|| match &self.ui.selection {
            Selection::Single(ItemRef::Text(id)) => Some(id.clone()),
            _ => None,
        });
        let Some(id) = target else {
            return Vec::new();
        };
        if self.notebook.current_mut().toggle_text_format(&id, mark).is_none() {
            return Vec::new();
        }
        let mut actions = vec![Action::RenderNeeded];
        self.commit(now_ms, &mut actions);
        actions
    }

    // --- Clipboard ---

    /// Copy the selected objects, or the selected text item, to the internal clipboard.
    pub fn copy_selection(&mut self) -> bool {
        let items = self.ui.selection.items();
        let objects: Vec<&ObjectId> = items
            .iter()
            .filter_map(|i| match i {
                ItemRef::Object(id) => Some(id),
                _ => None,
            })
            .collect();
        let note = self.notebook.current();
        let entry = if objects.is_empty() {
            match items.as_slice() {
                [ItemRef::Text(id)] => note.text(id).map(ClipEntry::from_text),
                _ => None,
            }
        } else {
            let strokes: Vec<Stroke> =
                note.lines.iter().filter(|l| objects.contains(&&l.object_id)).cloned().collect();
            Some(ClipEntry::Objects(strokes))
        };
        match entry {
            Some(entry) => {
                self.clipboard = Some(entry);
                true
            }
            None => false,
        }
    }

    /// Paste: system clipboard content at the viewport centre if there is any,
    /// else the internal clipboard.
    pub fn smart_paste(&mut self, system: Option<SystemClip>, now_ms: i64) -> Vec<Action> {
        self.system_clip = system;
        if self.system_clip.is_some() {
            let centre = self.viewport.center();
            return self.paste_system_at(centre, now_ms);
        }
        self.paste_internal(now_ms)
    }

    /// Paste the internal clipboard.
    ///
    /// Objects land offset by the paste offset under fresh ids and become the
    /// selection; text lands at the viewport centre plus the offset.
    pub fn paste_internal(&mut self, now_ms: i64) -> Vec<Action> {
        let Some(entry) = self.clipboard.clone() else {
            return Vec::new();
        };
        let mut actions = vec![Action::RenderNeeded];
        match entry {
            ClipEntry::Objects(source) => {
                let ids = &mut self.ids;
                let (strokes, new_ids) = clipboard::pasted_strokes(&source, || ids.mint(now_ms));
                let note = self.notebook.current_mut();
                for stroke in strokes {
                    note.add_stroke(stroke);
                }
                self.grouper.reset();
                self.ui.selection = Selection::from_items(new_ids.into_iter().map(ItemRef::Object).collect());
            }
            ClipEntry::Text { content, color, format } => {
                let at = self.world_center().offset(PASTE_OFFSET, PASTE_OFFSET);
                let id = self.ids.mint(now_ms);
                let mut item = TextItem::new(&id, at, &content, &color);
                item.format = format;
                self.notebook.current_mut().add_text(item);
                self.ui.selection = Selection::Single(ItemRef::Text(id));
            }
        }
        self.commit(now_ms, &mut actions);
        actions
    }

    /// Paste the cached system clipboard at a screen point.
    pub fn paste_system_at(&mut self, screen: Point, now_ms: i64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.ui.paste_overlay.take().is_some() {
            actions.push(Action::HidePasteOverlay);
        }
        let Some(clip) = self.system_clip.clone() else {
            return actions;
        };
        let at = self.to_world(screen);
        let id = self.ids.mint(now_ms);
        match clip {
            SystemClip::Image { data_url, width, height } => {
                let (width, height) = clipboard::fit_within(width, height, MAX_PASTED_IMAGE_SIZE);
                self.notebook.current_mut().add_image(ImageItem { id: id.clone(), x: at.x, y: at.y, width, height, data_url });
                self.ui.selection = Selection::Single(ItemRef::Image(id));
            }
            SystemClip::Text { content } => {
                let item = TextItem::new(&id, at, &clipboard::text_to_html(&content), &self.ui.color);
                self.notebook.current_mut().add_text(item);
                self.ui.selection = Selection::Single(ItemRef::Text(id));
            }
        }
        actions.push(Action::RenderNeeded);
        self.commit(now_ms, &mut actions);
        actions
    }

    // --- Overlay content ---

    /// Add a dropped image at a screen point, scaled down to fit.
    pub fn drop_image(&mut self, screen: Point, data_url: &str, width: f64, height: f64, now_ms: i64) -> Vec<Action> {
        self.system_clip_paste(SystemClip::Image { data_url: data_url.to_owned(), width, height }, screen, now_ms)
    }

    fn system_clip_paste(&mut self, clip: SystemClip, screen: Point, now_ms: i64) -> Vec<Action> {
        let cached = self.system_clip.replace(clip);
        let actions = self.paste_system_at(screen, now_ms);
        self.system_clip = cached;
        actions
    }

    /// Add an attachment for a file dropped at a screen point.
    pub fn drop_file(&mut self, screen: Point, file_path: &str, file_name: &str, file_type: &str, now_ms: i64) -> Vec<Action> {
        let at = self.to_world(screen);
        let id = self.ids.mint(now_ms);
        let note = self.notebook.current_mut();
        note.add_attachment(Attachment {
            id: id.clone(),
            x: at.x,
            y: at.y,
            file_path: file_path.to_owned(),
            file_name: file_name.to_owned(),
            file_type: file_type.to_owned(),
        });
        note.touch(now_ms);
        self.ui.selection = Selection::Single(ItemRef::Attachment(id));
        vec![Action::RenderNeeded, Action::SaveRequested]
    }

    #[must_use]
    pub fn open_attachment(&self, id: &str) -> Vec<Action> {
        self.note()
            .attachment(id)
            .map(|a| vec![Action::OpenFile(a.file_path.clone())])
            .unwrap_or_default()
    }

    // --- History ---

    pub fn undo(&mut self, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        if self.history.undo(self.notebook.current_mut()) {
            self.after_restore(now_ms, &mut actions);
        }
        actions
    }

    pub fn redo(&mut self, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        if self.history.redo(self.notebook.current_mut()) {
            self.after_restore(now_ms, &mut actions);
        }
        actions
    }

    fn after_restore(&mut self, now_ms: i64, actions: &mut Vec<Action>) {
        let note = self.notebook.current_mut();
        note.touch(now_ms);
        let kept: Vec<ItemRef> = self.ui.selection.items().into_iter().filter(|i| note.contains_item(i)).collect();
        self.ui.selection = Selection::from_items(kept);
        self.input = InputState::Idle;
        actions.push(Action::RenderNeeded);
        actions.push(Action::SaveRequested);
    }

    // --- Notes ---

    pub fn previous_note(&mut self, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        if self.notebook.previous(now_ms) {
            actions.extend(self.after_note_switch());
        }
        actions
    }

    /// Go to the next note, creating one past the end.
    pub fn next_note(&mut self, now_ms: i64) -> Vec<Action> {
        let mut actions = self.end_text_edit(now_ms);
        let origin = self.world_center();
        let ids = &mut self.ids;
        self.notebook.next(now_ms, || Note::new(&ids.mint(now_ms), origin, now_ms));
        actions.extend(self.after_note_switch());
        actions
    }

    /// The shell reopened the window. With clean slate on, a non-empty current
    /// note is set aside for a fresh one.
    pub fn on_toggled_open(&mut self, now_ms: i64) -> Vec<Action> {
        if !self.settings.open_with_clean_slate || self.note().is_empty() {
            return Vec::new();
        }
        let mut actions = self.end_text_edit(now_ms);
        let note = Note::new(&self.ids.mint(now_ms), self.world_center(), now_ms);
        self.notebook.push_and_switch(note);
        info!(notes = self.notebook.len(), "clean slate on reopen");
        actions.extend(self.after_note_switch());
        actions
    }

    fn after_note_switch(&mut self) -> Vec<Action> {
        self.ui.selection = Selection::None;
        self.ui.editing_text = None;
        self.edit_origin = None;
        self.input = InputState::Idle;
        self.grouper.reset();
        self.history.reset(self.notebook.current());
        vec![
            Action::NoteChanged { index: self.notebook.current_index(), count: self.notebook.len() },
            Action::RenderNeeded,
            Action::SaveRequested,
        ]
    }

    // --- Focus ---

    /// Window focus changed. Gaining focus caches `clip` as the current system
    /// clipboard; losing it ends text editing.
    pub fn on_focus_changed(&mut self, focused: bool, clip: Option<SystemClip>, now_ms: i64) -> Vec<Action> {
        self.ui.focused = focused;
        let mut actions = Vec::new();
        if focused {
            self.system_clip = clip;
        } else {
            actions.extend(self.end_text_edit(now_ms));
            if self.ui.paste_overlay.take().is_some() {
                actions.push(Action::HidePasteOverlay);
            }
        }
        actions.push(Action::OpacityChanged(self.settings.opacity(focused)));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Record an undoable edit: snapshot, timestamp, redraw, and save.
    fn commit(&mut self, now_ms: i64, actions: &mut Vec<Action>) {
        let note = self.notebook.current_mut();
        note.touch(now_ms);
        self.history.save(note);
        if !actions.contains(&Action::RenderNeeded) {
            actions.push(Action::RenderNeeded);
        }
        actions.push(Action::SaveRequested);
    }
}

fn transform_actions(changed: bool) -> Vec<Action> {
    if changed { vec![Action::RenderNeeded, Action::SaveRequested] } else { Vec::new() }
}

fn observe_note_ids(ids: &mut IdGen, note: &Note) {
    let all = std::iter::once(note.id.as_str())
        .chain(note.lines.iter().map(|l| l.object_id.as_str()))
        .chain(note.text_items.iter().map(|t| t.id.as_str()))
        .chain(note.images.iter().map(|i| i.id.as_str()))
        .chain(note.attachments.iter().map(|a| a.id.as_str()));
    for id in all {
        if let Ok(value) = id.parse::<i64>() {
            ids.observe(value);
        }
    }
}
