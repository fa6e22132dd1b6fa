//! Clipboards: the internal copy buffer and the system clipboard contract.
//!
//! The internal buffer holds detached copies, never references into a note.
//! Reading the OS clipboard is the shell's job; the engine only sees the
//! resulting [`SystemClip`].

#[cfg(test)]
#[path = "clipboard_test.rs"]
mod clipboard_test;

use std::collections::HashMap;

use crate::consts::PASTE_OFFSET;
use crate::doc::{ObjectId, Stroke, TextFormat, TextItem};

/// What the internal clipboard holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipEntry {
    /// Copies of every stroke of the copied objects, source ids intact.
    Objects(Vec<Stroke>),
    /// A copied text item.
    Text { content: String, color: String, format: TextFormat },
}

impl ClipEntry {
    #[must_use]
    pub fn from_text(item: &TextItem) -> Self {
        Self::Text { content: item.content.clone(), color: item.color.clone(), format: item.format }
    }
}

/// Re-home copied strokes for pasting.
///
/// Each distinct source object id maps to one fresh id from `mint`, and every
/// point moves by [`PASTE_OFFSET`] on both axes. Returns the strokes and the
/// new ids in first-seen order.
pub fn pasted_strokes(source: &[Stroke], mut mint: impl FnMut() -> ObjectId) -> (Vec<Stroke>, Vec<ObjectId>) {
    let mut remap: HashMap<&str, ObjectId> = HashMap::new();
    let mut order = Vec::new();
    let strokes = source
        .iter()
        .map(|line| {
            let id = remap
                .entry(line.object_id.as_str())
                .or_insert_with(|| {
                    let id = mint();
                    order.push(id.clone());
                    id
                })
                .clone();
            let mut copy = line.clone();
            copy.object_id = id;
            copy.translate(PASTE_OFFSET, PASTE_OFFSET);
            copy
        })
        .collect();
    (strokes, order)
}

/// Content read from the OS clipboard.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemClip {
    Image { data_url: String, width: f64, height: f64 },
    Text { content: String },
}

impl SystemClip {
    /// Combine the raw clipboard reads: an image wins over text, and blank
    /// text counts as nothing.
    #[must_use]
    pub fn pick(image: Option<(String, f64, f64)>, text: Option<String>) -> Option<Self> {
        if let Some((data_url, width, height)) = image {
            return Some(Self::Image { data_url, width, height });
        }
        text.filter(|t| !t.trim().is_empty()).map(|content| Self::Text { content })
    }
}

/// Source of system clipboard contents.
pub trait SystemClipboard {
    fn read(&mut self) -> Option<SystemClip>;
}

/// Scale an image down so neither side exceeds `max`, keeping its aspect ratio.
#[must_use]
pub fn fit_within(width: f64, height: f64, max: f64) -> (f64, f64) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = (max / width).min(max / height);
    (width * scale, height * scale)
}

/// Escape plain text so it can be stored as rich-text content.
#[must_use]
pub fn text_to_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>")
}
