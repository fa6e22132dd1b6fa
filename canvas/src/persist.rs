//! Persisted payload: settings, encode/decode, legacy migration, clean slate.
//!
//! The on-disk shape is one JSON object:
//!
//! ```text
//! { notes, currentNoteIndex, settings, transform: { zoomLevel, panX, panY, rotation } }
//! ```
//!
//! Decoding is lenient. Only text that is not JSON at all is an error; every
//! other defect falls back field by field to a safe default.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::camera::{Camera, Point};
use crate::doc::{Attachment, ImageItem, Note, Stroke, TextItem};
use crate::ids::IdGen;
use crate::notes::Notebook;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// User preferences stored next to the document.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Ctrl-wheel and pinch zoom.
    pub pinch_zoom: bool,
    /// Wheel and middle-drag pan.
    pub pan: bool,
    /// Rotate gestures.
    pub rotate: bool,
    pub show_zoom_controls: bool,
    /// Start on a fresh blank note each time the window is opened.
    pub open_with_clean_slate: bool,
    /// Also export the active note to the export folder on every save.
    pub auto_export: bool,
    pub focused_opacity: f64,
    pub unfocused_opacity: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pinch_zoom: true,
            pan: true,
            rotate: true,
            show_zoom_controls: true,
            open_with_clean_slate: false,
            auto_export: false,
            focused_opacity: 1.0,
            unfocused_opacity: 0.6,
        }
    }
}

impl Settings {
    /// Background opacity for the given window focus state.
    #[must_use]
    pub fn opacity(&self, focused: bool) -> f64 {
        let value = if focused { self.focused_opacity } else { self.unfocused_opacity };
        value.clamp(0.0, 1.0)
    }
}

/// The full persisted document, borrowed for encoding.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload<'a> {
    pub notes: &'a [Note],
    pub current_note_index: usize,
    pub settings: &'a Settings,
    pub transform: Camera,
}

impl Payload<'_> {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Everything recovered from a stored payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loaded {
    pub notes: Vec<Note>,
    pub current_note_index: usize,
    pub settings: Settings,
    /// `None` when the payload carried no transform.
    pub transform: Option<Camera>,
    /// True when the notes came from the single-note legacy layout.
    pub migrated: bool,
    /// Entries of `notes` that were not objects at all.
    pub skipped_notes: usize,
    /// Strokes, text items, images and attachments dropped for bad shape.
    pub dropped_items: usize,
}

impl Loaded {
    /// Whether saving this back would lose something that was stored.
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        self.skipped_notes > 0 || self.dropped_items > 0
    }
}

/// Parse a stored payload.
///
/// `now_ms` stamps notes that arrive without an id.
pub fn decode(text: &str, now_ms: i64) -> Result<Loaded, PersistError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(decode_value(&value, now_ms))
}

/// Lenient decode of an already parsed payload.
#[must_use]
pub fn decode_value(value: &Value, now_ms: i64) -> Loaded {
    let Some(root) = value.as_object() else {
        debug!("stored payload is not an object; starting fresh");
        return Loaded::default();
    };

    let mut loaded = Loaded {
        settings: root.get("settings").map(decode_settings).unwrap_or_default(),
        transform: root.get("transform").map(decode_transform),
        ..Loaded::default()
    };

    if let Some(raw_notes) = root.get("notes").and_then(Value::as_array).filter(|n| !n.is_empty()) {
        for raw in raw_notes {
            match raw.as_object() {
                Some(fields) => loaded.notes.push(decode_note(fields, &mut loaded.dropped_items)),
                None => {
                    warn!("skipping note entry that is not an object");
                    loaded.skipped_notes += 1;
                }
            }
        }
        let index = root.get("currentNoteIndex").and_then(Value::as_u64).unwrap_or(0);
        loaded.current_note_index = usize::try_from(index).unwrap_or(usize::MAX);
    } else if ["lines", "textItems", "images"].iter().any(|k| root.contains_key(*k)) {
        loaded.notes.push(migrate_legacy(root, now_ms, &mut loaded.dropped_items));
        loaded.migrated = true;
        info!("migrated single-note legacy payload");
    }

    assign_note_ids(&mut loaded.notes, now_ms);
    for note in &mut loaded.notes {
        note.repair_ids();
    }
    if let Some(last) = loaded.notes.len().checked_sub(1) {
        loaded.current_note_index = loaded.current_note_index.min(last);
    }
    loaded
}

fn decode_settings(value: &Value) -> Settings {
    let Some(fields) = value.as_object() else {
        return Settings::default();
    };
    let mut merged = match serde_json::to_value(Settings::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, field) in fields {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), field.clone());
        if serde_json::from_value::<Settings>(Value::Object(candidate)).is_ok() {
            merged.insert(key.clone(), field.clone());
        } else {
            warn!(field = %key, "ignoring mistyped setting");
        }
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

fn decode_transform(value: &Value) -> Camera {
    serde_json::from_value::<Camera>(value.clone())
        .unwrap_or_default()
        .sanitized()
}

/// Decode each element of an array on its own, dropping and counting the bad
/// ones. A value that is not an array counts as one dropped item.
fn lenient_list<T: serde::de::DeserializeOwned>(fields: &Map<String, Value>, key: &str, dropped: &mut usize) -> Vec<T> {
    let items = match fields.get(key) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!(field = key, "expected a list; ignoring it");
            *dropped += 1;
            return Vec::new();
        }
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(field = key, error = %e, "dropping undecodable item");
                *dropped += 1;
                None
            }
        })
        .collect()
}

fn decode_note(fields: &Map<String, Value>, dropped: &mut usize) -> Note {
    let number = |key: &str| fields.get(key).and_then(Value::as_f64).filter(|v| v.is_finite()).unwrap_or(0.0);
    let stamp = |key: &str| fields.get(key).and_then(Value::as_i64).unwrap_or(0);
    Note {
        id: fields.get("id").and_then(id_text).unwrap_or_default(),
        lines: lenient_list::<Stroke>(fields, "lines", dropped),
        text_items: lenient_list::<TextItem>(fields, "textItems", dropped),
        images: lenient_list::<ImageItem>(fields, "images", dropped),
        attachments: lenient_list::<Attachment>(fields, "attachments", dropped),
        origin_x: number("originX"),
        origin_y: number("originY"),
        created_at: stamp("createdAt"),
        last_modified: stamp("lastModified"),
    }
}

/// Ids were written as strings, but older data may hold plain numbers.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn migrate_legacy(root: &Map<String, Value>, now_ms: i64, dropped: &mut usize) -> Note {
    let mut note = Note::new("", Point::default(), now_ms);
    note.lines = lenient_list::<Stroke>(root, "lines", dropped);
    note.text_items = lenient_list::<TextItem>(root, "textItems", dropped);
    note.images = lenient_list::<ImageItem>(root, "images", dropped);
    note
}

/// Give every note a distinct id. Missing ids and repeats of an earlier
/// note's id are replaced with ids minted after every numeric id present.
fn assign_note_ids(notes: &mut [Note], now_ms: i64) {
    let mut ids = IdGen::new();
    for note in notes.iter() {
        if let Ok(value) = note.id.parse::<i64>() {
            ids.observe(value);
        }
    }
    let mut seen: HashSet<String> = HashSet::new();
    for note in notes.iter_mut() {
        if note.id.is_empty() || seen.contains(&note.id) {
            let fresh = ids.mint(now_ms);
            if !note.id.is_empty() {
                warn!(duplicate = %note.id, id = %fresh, "renamed note with a repeated id");
            }
            note.id = fresh;
        }
        seen.insert(note.id.clone());
    }
}

/// A decoded payload turned into live session state.
#[derive(Debug, Clone)]
pub struct Restored {
    pub notebook: Notebook,
    pub camera: Camera,
    pub settings: Settings,
    /// A fresh note was appended because `open_with_clean_slate` is set.
    pub clean_slate: bool,
}

/// Build session state from `loaded`.
///
/// With `open_with_clean_slate`, the loaded notes are kept, a blank note from
/// `fresh_note` is appended and shown, and the stored transform is ignored.
pub fn restore(loaded: Loaded, mut fresh_note: impl FnMut() -> Note) -> Restored {
    let Loaded { notes, current_note_index, settings, transform, .. } = loaded;
    if settings.open_with_clean_slate {
        let had_notes = !notes.is_empty();
        let mut notebook = Notebook::from_parts(notes, current_note_index, &mut fresh_note);
        if had_notes {
            notebook.push_and_switch(fresh_note());
        }
        info!(notes = notebook.len(), "opened with a clean slate");
        return Restored { notebook, camera: Camera::default(), settings, clean_slate: had_notes };
    }
    let notebook = Notebook::from_parts(notes, current_note_index, fresh_note);
    Restored { notebook, camera: transform.unwrap_or_default(), settings, clean_slate: false }
}
