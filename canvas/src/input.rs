//! Input model: tools, modifier keys, mouse buttons, selection, and the
//! gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the active gesture being tracked between
//! pointer-down and pointer-up, carrying all context needed to compute
//! incremental deltas and commit the final edit on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::Deserialize;

use crate::camera::Point;
use crate::consts::{DEFAULT_COLOR, DEFAULT_STROKE_WIDTH};
use crate::doc::{ItemRef, ObjectId, ShapeKind};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pick, drag, and marquee-select.
    Select,
    /// Freehand drawing (default).
    #[default]
    Draw,
    /// Drag out a synthesized shape.
    Shape(ShapeKind),
    /// Click to place text; the canvas ignores pointer input otherwise.
    Text,
}

impl Tool {
    /// Whether pointer-down on empty canvas starts a stroke.
    #[must_use]
    pub fn draws(self) -> bool {
        matches!(self, Self::Draw | Self::Shape(_))
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Cmd on macOS or Ctrl elsewhere.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    #[must_use]
    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the shell (e.g. `"Delete"`, `"["`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Case-insensitive comparison for single-letter shortcuts.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// The current selection.
///
/// One model covers clicks, marquee, and select-all. A set of exactly one
/// item is always stored as `Single`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Single(ItemRef),
    Multi(Vec<ItemRef>),
}

impl Selection {
    /// Build a selection from a list, collapsing zero or one item.
    #[must_use]
    pub fn from_items(mut items: Vec<ItemRef>) -> Self {
        items.dedup();
        match items.len() {
            0 => Self::None,
            1 => items.pop().map_or(Self::None, Self::Single),
            _ => Self::Multi(items),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    #[must_use]
    pub fn items(&self) -> Vec<ItemRef> {
        match self {
            Self::None => Vec::new(),
            Self::Single(item) => vec![item.clone()],
            Self::Multi(items) => items.clone(),
        }
    }

    #[must_use]
    pub fn contains(&self, item: &ItemRef) -> bool {
        match self {
            Self::None => false,
            Self::Single(selected) => selected == item,
            Self::Multi(items) => items.contains(item),
        }
    }

    /// Drop `item` from the selection, collapsing as needed.
    pub fn remove(&mut self, item: &ItemRef) {
        let remaining: Vec<ItemRef> = self.items().into_iter().filter(|i| i != item).collect();
        *self = Self::from_items(remaining);
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Colour for new strokes and text.
    pub color: String,
    /// Width for new strokes.
    pub stroke_width: f64,
    pub selection: Selection,
    /// Text item whose editor currently has focus.
    pub editing_text: Option<String>,
    /// Whether the overlay window has focus.
    pub focused: bool,
    /// Screen point where the paste overlay is shown.
    pub paste_overlay: Option<Point>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            color: DEFAULT_COLOR.to_owned(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            selection: Selection::None,
            editing_text: None,
            focused: true,
            paste_overlay: None,
        }
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// commit the edit on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Recording a freehand stroke.
    Drawing {
        /// Object the stroke will join on commit.
        object_id: ObjectId,
        /// Sampled document-space points so far.
        points: Vec<Point>,
    },
    /// Dragging out a shape; the preview is regenerated from the anchors.
    DrawingShape {
        kind: ShapeKind,
        /// Document-space anchor where the drag started.
        start: Point,
        /// Latest document-space pointer position.
        current: Point,
    },
    /// Moving the selected items.
    DraggingItems {
        items: Vec<ItemRef>,
        /// Document-space pointer position at the previous event.
        last_world: Point,
        /// Whether any movement was applied yet.
        moved: bool,
    },
    /// Resizing a text box or image from its bottom-right handle.
    Resizing {
        item: ItemRef,
        /// Document-space pointer position at the start of the resize.
        start_world: Point,
        /// Size at the start of the resize.
        orig_w: f64,
        orig_h: f64,
    },
    /// Rubber-band selection.
    Marquee {
        /// Document-space anchor.
        start: Point,
        /// Latest document-space pointer position.
        current: Point,
    },
    /// Middle-button pan.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
}
