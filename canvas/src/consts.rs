//! Shared numeric constants for the canvas crate.

// ── View transform ──────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.25;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 4.0;

/// Zoom increment for keyboard and button zoom.
pub const ZOOM_STEP: f64 = 0.25;

/// Zoom change per pixel of ctrl-wheel (pinch) delta.
pub const WHEEL_ZOOM_FACTOR: f64 = 0.01;

// ── Hit-testing ─────────────────────────────────────────────────

/// Proximity slop in document pixels for stroke hit-testing, added to half the stroke width.
pub const HIT_RADIUS: f64 = 10.0;

/// Screen-space slop in pixels for overlay resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Objects ─────────────────────────────────────────────────────

/// Strokes started within this many milliseconds of the previous stroke share an object id.
pub const OBJECT_GROUP_TIMEOUT_MS: i64 = 500;

/// Translation applied to pasted objects and text, in document pixels.
pub const PASTE_OFFSET: f64 = 20.0;

/// Default stroke colour.
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Default stroke width in document pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 4.0;

// ── Shapes ──────────────────────────────────────────────────────

/// Segment count of the polygon approximating an ellipse.
pub const ELLIPSE_SEGMENTS: usize = 64;

/// Upper bound on arrowhead length in document pixels.
pub const ARROW_HEAD_MAX: f64 = 20.0;

/// Arrowhead length as a fraction of shaft length.
pub const ARROW_HEAD_RATIO: f64 = 0.3;

/// Arrowhead half-angle (30°).
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

// ── Overlay items ───────────────────────────────────────────────

/// Fallback text box width used for hit-testing when none is stored.
pub const DEFAULT_TEXT_WIDTH: f64 = 150.0;

/// Fallback text box height used for hit-testing when none is stored.
pub const DEFAULT_TEXT_HEIGHT: f64 = 40.0;

/// Minimum text box width after a resize.
pub const MIN_TEXT_WIDTH: f64 = 100.0;

/// Minimum text box height after a resize.
pub const MIN_TEXT_HEIGHT: f64 = 40.0;

/// Minimum image side after a resize.
pub const MIN_IMAGE_SIZE: f64 = 50.0;

/// Pasted images are scaled down so neither side exceeds this.
pub const MAX_PASTED_IMAGE_SIZE: f64 = 400.0;

/// Attachment chip width in document pixels.
pub const ATTACHMENT_WIDTH: f64 = 160.0;

/// Attachment chip height in document pixels.
pub const ATTACHMENT_HEIGHT: f64 = 48.0;

// ── History ─────────────────────────────────────────────────────

/// Maximum number of snapshots retained per note.
pub const MAX_HISTORY_SIZE: usize = 50;

// ── Rendering ───────────────────────────────────────────────────

/// Padding around a selected object's bounding box.
pub const SELECTION_PADDING: f64 = 8.0;

/// Highlight colour for a single selected item.
pub const SINGLE_SELECTION_COLOR: &str = "#3b82f6";

/// Highlight colour for every item of a multi-selection.
pub const MULTI_SELECTION_COLOR: &str = "#f59e0b";
