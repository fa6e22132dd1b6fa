//! Document model: strokes, overlay items, and the per-note store.
//!
//! A [`Note`] owns everything drawn on one page: committed strokes (grouped
//! into manipulable objects by `object_id`), rich-text items, pasted images,
//! and file attachments. All coordinates are document space.
//!
//! Field names serialize in camelCase so persisted files stay compatible with
//! earlier saves, and every field has a default so partially written or
//! older records still load.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{
    ATTACHMENT_HEIGHT, ATTACHMENT_WIDTH, DEFAULT_COLOR, DEFAULT_STROKE_WIDTH, DEFAULT_TEXT_HEIGHT, DEFAULT_TEXT_WIDTH,
    MIN_IMAGE_SIZE, MIN_TEXT_HEIGHT, MIN_TEXT_WIDTH,
};
use crate::geometry::{self, Rect};
use crate::history::NoteSnapshot;

/// Identifier shared by every stroke of one logical object.
pub type ObjectId = String;

/// The tool that produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Raw pointer samples.
    Freehand,
    /// Axis-aligned rectangle, 5 vertices (closed).
    Rectangle,
    /// 64-segment ellipse, 65 vertices (closed).
    Circle,
    /// Isosceles triangle, 4 vertices (closed).
    Triangle,
    /// Two endpoints.
    Line,
    /// Shaft plus a V-shaped head, 5 vertices.
    Arrow,
}

impl ShapeKind {
    /// Whether the shape encloses an area that counts for hit-testing.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Rectangle | Self::Circle | Self::Triangle)
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

/// A committed polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_stroke_width")]
    pub width: f64,
    #[serde(default)]
    pub object_id: ObjectId,
    /// Absent on data saved before shapes were tagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ShapeKind>,
}

impl Stroke {
    #[must_use]
    pub fn new(points: Vec<Point>, color: &str, width: f64, object_id: &str, tool: Option<ShapeKind>) -> Self {
        Self { points, color: color.to_owned(), width, object_id: object_id.to_owned(), tool }
    }

    /// The stroke's shape kind: the explicit tag, else the legacy vertex-count
    /// heuristic, else freehand.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.tool
            .or_else(|| geometry::infer_shape_kind(&self.points))
            .unwrap_or(ShapeKind::Freehand)
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.points)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }
}

/// Inline formatting marks a text item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMark {
    Bold,
    Italic,
    Underline,
}

/// Explicit inline formatting state of a text item.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl TextFormat {
    /// Flip one mark and return its new state.
    pub fn toggle(&mut self, mark: FormatMark) -> bool {
        let flag = match mark {
            FormatMark::Bold => &mut self.bold,
            FormatMark::Italic => &mut self.italic,
            FormatMark::Underline => &mut self.underline,
        };
        *flag = !*flag;
        *flag
    }
}

/// A rich-text note placed on the overlay layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Inline HTML limited to bold/italic/underline marks.
    #[serde(default, alias = "text")]
    pub content: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub format: TextFormat,
}

impl TextItem {
    #[must_use]
    pub fn new(id: &str, at: Point, content: &str, color: &str) -> Self {
        Self {
            id: id.to_owned(),
            x: at.x,
            y: at.y,
            content: content.to_owned(),
            color: color.to_owned(),
            width: None,
            height: None,
            format: TextFormat::default(),
        }
    }

    /// Content with markup removed and the common entities decoded.
    #[must_use]
    pub fn plain_text(&self) -> String {
        strip_markup(&self.content)
    }

    /// Whether the item holds no visible text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Box used for hit-testing and highlighting.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(
            self.x,
            self.y,
            self.width.unwrap_or(DEFAULT_TEXT_WIDTH),
            self.height.unwrap_or(DEFAULT_TEXT_HEIGHT),
        )
    }
}

fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// An embedded raster image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// `data:` URL carrying the base64 payload.
    #[serde(default)]
    pub data_url: String,
}

impl ImageItem {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.x, self.y, self.width, self.height)
    }
}

/// A reference to an external file dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
}

impl Attachment {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.x, self.y, ATTACHMENT_WIDTH, ATTACHMENT_HEIGHT)
    }
}

/// Reference to one selectable item of a note.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemRef {
    /// Every stroke sharing this object id.
    Object(ObjectId),
    Text(String),
    Image(String),
    Attachment(String),
}

/// One page of the notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub lines: Vec<Stroke>,
    #[serde(default)]
    pub text_items: Vec<TextItem>,
    #[serde(default)]
    pub images: Vec<ImageItem>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_modified: i64,
}

impl Note {
    /// Create an empty note whose reference dot sits at `origin`.
    #[must_use]
    pub fn new(id: &str, origin: Point, now_ms: i64) -> Self {
        Self {
            id: id.to_owned(),
            lines: Vec::new(),
            text_items: Vec::new(),
            images: Vec::new(),
            attachments: Vec::new(),
            origin_x: origin.x,
            origin_y: origin.y,
            created_at: now_ms,
            last_modified: now_ms,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.origin_x, self.origin_y)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.text_items.is_empty() && self.images.is_empty() && self.attachments.is_empty()
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.last_modified = now_ms;
    }

    /// Remove everything from the note. Returns whether anything was removed.
    pub fn clear(&mut self) -> bool {
        let had_content = !self.is_empty();
        self.lines.clear();
        self.text_items.clear();
        self.images.clear();
        self.attachments.clear();
        had_content
    }

    // --- Strokes / objects ---

    /// Append a committed stroke. Strokes with fewer than two points are dropped.
    pub fn add_stroke(&mut self, stroke: Stroke) -> bool {
        if stroke.points.len() < 2 {
            return false;
        }
        self.lines.push(stroke);
        true
    }

    #[must_use]
    pub fn has_object(&self, id: &str) -> bool {
        self.lines.iter().any(|l| l.object_id == id)
    }

    /// Distinct object ids in draw order (first stroke decides position).
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = Vec::new();
        for line in &self.lines {
            if !ids.contains(&line.object_id) {
                ids.push(line.object_id.clone());
            }
        }
        ids
    }

    /// Strokes belonging to one object, in draw order.
    pub fn object_strokes<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Stroke> + 'a {
        self.lines.iter().filter(move |l| l.object_id == id)
    }

    #[must_use]
    pub fn object_bounds(&self, id: &str) -> Option<Rect> {
        Rect::bounding(self.object_strokes(id).flat_map(|l| l.points.iter()))
    }

    /// Translate every point of every stroke sharing `id`.
    pub fn move_object(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        let mut moved = false;
        for line in self.lines.iter_mut().filter(|l| l.object_id == id) {
            line.translate(dx, dy);
            moved = true;
        }
        moved
    }

    /// Remove every stroke sharing `id`.
    pub fn delete_object(&mut self, id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.object_id != id);
        self.lines.len() != before
    }

    pub fn recolor_object(&mut self, id: &str, color: &str) -> bool {
        let mut changed = false;
        for line in self.lines.iter_mut().filter(|l| l.object_id == id) {
            line.color = color.to_owned();
            changed = true;
        }
        changed
    }

    // --- Text ---

    #[must_use]
    pub fn text(&self, id: &str) -> Option<&TextItem> {
        self.text_items.iter().find(|t| t.id == id)
    }

    pub fn text_mut(&mut self, id: &str) -> Option<&mut TextItem> {
        self.text_items.iter_mut().find(|t| t.id == id)
    }

    pub fn add_text(&mut self, item: TextItem) {
        self.text_items.push(item);
    }

    pub fn remove_text(&mut self, id: &str) -> Option<TextItem> {
        let idx = self.text_items.iter().position(|t| t.id == id)?;
        Some(self.text_items.remove(idx))
    }

    pub fn recolor_text(&mut self, id: &str, color: &str) -> bool {
        let Some(item) = self.text_mut(id) else {
            return false;
        };
        item.color = color.to_owned();
        true
    }

    pub fn set_text_content(&mut self, id: &str, content: &str) -> bool {
        let Some(item) = self.text_mut(id) else {
            return false;
        };
        item.content = content.to_owned();
        true
    }

    /// Flip a format mark; returns the item's resulting format.
    pub fn toggle_text_format(&mut self, id: &str, mark: FormatMark) -> Option<TextFormat> {
        let item = self.text_mut(id)?;
        item.format.toggle(mark);
        Some(item.format)
    }

    /// Set a text box size, clamped to the minimum box.
    pub fn resize_text(&mut self, id: &str, width: f64, height: f64) -> bool {
        let Some(item) = self.text_mut(id) else {
            return false;
        };
        item.width = Some(width.max(MIN_TEXT_WIDTH));
        item.height = Some(height.max(MIN_TEXT_HEIGHT));
        true
    }

    // --- Images ---

    #[must_use]
    pub fn image(&self, id: &str) -> Option<&ImageItem> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn add_image(&mut self, image: ImageItem) {
        self.images.push(image);
    }

    pub fn remove_image(&mut self, id: &str) -> Option<ImageItem> {
        let idx = self.images.iter().position(|i| i.id == id)?;
        Some(self.images.remove(idx))
    }

    /// Set an image size, clamped to the minimum side.
    pub fn resize_image(&mut self, id: &str, width: f64, height: f64) -> bool {
        let Some(image) = self.images.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        image.width = width.max(MIN_IMAGE_SIZE);
        image.height = height.max(MIN_IMAGE_SIZE);
        true
    }

    // --- Attachments ---

    #[must_use]
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == id)
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, id: &str) -> Option<Attachment> {
        let idx = self.attachments.iter().position(|a| a.id == id)?;
        Some(self.attachments.remove(idx))
    }

    // --- Items generically ---

    /// Every item of the note: objects first (draw order), then text, images, attachments.
    #[must_use]
    pub fn all_items(&self) -> Vec<ItemRef> {
        let mut items: Vec<ItemRef> = self.object_ids().into_iter().map(ItemRef::Object).collect();
        items.extend(self.text_items.iter().map(|t| ItemRef::Text(t.id.clone())));
        items.extend(self.images.iter().map(|i| ItemRef::Image(i.id.clone())));
        items.extend(self.attachments.iter().map(|a| ItemRef::Attachment(a.id.clone())));
        items
    }

    #[must_use]
    pub fn contains_item(&self, item: &ItemRef) -> bool {
        match item {
            ItemRef::Object(id) => self.has_object(id),
            ItemRef::Text(id) => self.text(id).is_some(),
            ItemRef::Image(id) => self.image(id).is_some(),
            ItemRef::Attachment(id) => self.attachment(id).is_some(),
        }
    }

    #[must_use]
    pub fn item_bounds(&self, item: &ItemRef) -> Option<Rect> {
        match item {
            ItemRef::Object(id) => self.object_bounds(id),
            ItemRef::Text(id) => self.text(id).map(TextItem::bounds),
            ItemRef::Image(id) => self.image(id).map(ImageItem::bounds),
            ItemRef::Attachment(id) => self.attachment(id).map(Attachment::bounds),
        }
    }

    pub fn move_item(&mut self, item: &ItemRef, dx: f64, dy: f64) -> bool {
        let position = match item {
            ItemRef::Object(id) => return self.move_object(id, dx, dy),
            ItemRef::Text(id) => self.text_items.iter_mut().find(|t| &t.id == id).map(|t| (&mut t.x, &mut t.y)),
            ItemRef::Image(id) => self.images.iter_mut().find(|i| &i.id == id).map(|i| (&mut i.x, &mut i.y)),
            ItemRef::Attachment(id) => {
                self.attachments.iter_mut().find(|a| &a.id == id).map(|a| (&mut a.x, &mut a.y))
            }
        };
        let Some((x, y)) = position else {
            return false;
        };
        *x += dx;
        *y += dy;
        true
    }

    pub fn remove_item(&mut self, item: &ItemRef) -> bool {
        match item {
            ItemRef::Object(id) => self.delete_object(id),
            ItemRef::Text(id) => self.remove_text(id).is_some(),
            ItemRef::Image(id) => self.remove_image(id).is_some(),
            ItemRef::Attachment(id) => self.remove_attachment(id).is_some(),
        }
    }

    /// Recolor an object or text item. Images and attachments have no colour.
    pub fn recolor_item(&mut self, item: &ItemRef, color: &str) -> bool {
        match item {
            ItemRef::Object(id) => self.recolor_object(id, color),
            ItemRef::Text(id) => self.recolor_text(id, color),
            ItemRef::Image(_) | ItemRef::Attachment(_) => false,
        }
    }

    // --- History ---

    /// Deep copy of the undoable collections.
    #[must_use]
    pub fn snapshot(&self) -> NoteSnapshot {
        NoteSnapshot {
            lines: self.lines.clone(),
            text_items: self.text_items.clone(),
            images: self.images.clone(),
        }
    }

    /// Replace the undoable collections with a snapshot's contents.
    pub fn restore(&mut self, snapshot: &NoteSnapshot) {
        self.lines.clone_from(&snapshot.lines);
        self.text_items.clone_from(&snapshot.text_items);
        self.images.clone_from(&snapshot.images);
    }

    // --- Repair ---

    /// Give every stroke and overlay item a non-empty id.
    ///
    /// Older saves may lack them; each stroke without an object id becomes its
    /// own object. Returns how many ids were assigned.
    pub fn repair_ids(&mut self) -> usize {
        let prefix = format!("legacy-{}", self.id);
        let mut assigned = 0;
        let mut assign = |slot: &mut String| {
            if slot.is_empty() {
                assigned += 1;
                *slot = format!("{prefix}-{assigned}");
            }
        };
        self.lines.iter_mut().for_each(|l| assign(&mut l.object_id));
        self.text_items.iter_mut().for_each(|t| assign(&mut t.id));
        self.images.iter_mut().for_each(|i| assign(&mut i.id));
        self.attachments.iter_mut().for_each(|a| assign(&mut a.id));
        assigned
    }
}
