#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::doc::Stroke;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn note_with_stroke(id: &str) -> Note {
    let mut n = Note::new(id, pt(10.0, 20.0), 5);
    n.add_stroke(Stroke::new(vec![pt(0.0, 0.0), pt(5.0, 5.0)], "#ff0000", 3.0, "obj1", None));
    n.add_text(TextItem::new("t1", pt(1.0, 1.0), "<b>hi</b>", "#fff"));
    n
}

fn blank() -> Note {
    Note::new("fresh", pt(0.0, 0.0), 99)
}

// =============================================================
// Settings
// =============================================================

#[test]
fn settings_defaults() {
    let s = Settings::default();
    assert!(s.pinch_zoom && s.pan && s.rotate && s.show_zoom_controls);
    assert!(!s.open_with_clean_slate);
    assert!(!s.auto_export);
    assert_eq!(s.opacity(true), 1.0);
    assert_eq!(s.opacity(false), 0.6);
}

#[test]
fn settings_missing_fields_take_defaults() {
    let loaded = decode_value(&json!({"settings": {"pan": false}}), 0);
    assert!(!loaded.settings.pan);
    assert!(loaded.settings.pinch_zoom);
}

#[test]
fn settings_mistyped_field_is_ignored_alone() {
    let loaded = decode_value(&json!({"settings": {"pan": "nope", "rotate": false}}), 0);
    assert!(loaded.settings.pan);
    assert!(!loaded.settings.rotate);
}

#[test]
fn opacity_is_clamped() {
    let s = Settings { focused_opacity: 3.0, unfocused_opacity: -1.0, ..Settings::default() };
    assert_eq!(s.opacity(true), 1.0);
    assert_eq!(s.opacity(false), 0.0);
}

// =============================================================
// Encode / decode
// =============================================================

#[test]
fn payload_uses_stored_field_names() {
    let notes = vec![note_with_stroke("a")];
    let settings = Settings::default();
    let payload = Payload { notes: &notes, current_note_index: 0, settings: &settings, transform: Camera::default() };
    let value: Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
    assert!(value["notes"].is_array());
    assert_eq!(value["currentNoteIndex"], 0);
    assert_eq!(value["settings"]["openWithCleanSlate"], false);
    assert_eq!(value["transform"]["zoomLevel"], 1.0);
    assert_eq!(value["notes"][0]["textItems"][0]["content"], "<b>hi</b>");
}

#[test]
fn save_then_load_round_trip() {
    let notes = vec![note_with_stroke("a"), note_with_stroke("b")];
    let settings = Settings { auto_export: true, ..Settings::default() };
    let camera = Camera { zoom: 2.0, pan_x: 5.0, pan_y: -5.0, rotation: 12.0, frozen: false };
    let payload = Payload { notes: &notes, current_note_index: 1, settings: &settings, transform: camera };
    let loaded = decode(&payload.to_json().unwrap(), 0).unwrap();
    assert_eq!(loaded.notes, notes);
    assert_eq!(loaded.current_note_index, 1);
    assert_eq!(loaded.settings, settings);
    assert_eq!(loaded.transform, Some(camera));
    assert!(!loaded.migrated);
}

#[test]
fn non_json_is_malformed() {
    assert!(matches!(decode("{not json", 0), Err(PersistError::Malformed(_))));
}

#[test]
fn non_object_payload_loads_empty() {
    let loaded = decode("null", 0).unwrap();
    assert!(loaded.notes.is_empty());
    assert_eq!(loaded.settings, Settings::default());
}

#[test]
fn non_object_note_is_skipped_not_fatal() {
    let loaded = decode_value(&json!({"notes": [{"id": "ok"}, "bad"], "currentNoteIndex": 1}), 0);
    assert_eq!(loaded.notes.len(), 1);
    assert_eq!(loaded.skipped_notes, 1);
    assert_eq!(loaded.current_note_index, 0);
    assert!(loaded.is_lossy());
}

#[test]
fn one_bad_stroke_keeps_the_rest_of_the_note() {
    let loaded = decode_value(
        &json!({"notes": [{
            "id": "n1",
            "lines": [
                {"points": [{"x": 0, "y": 0}, {"x": 4, "y": 4}], "objectId": "a"},
                {"points": [{"x": 1, "y": 1}], "width": "thick"}
            ],
            "textItems": [{"id": "t", "x": 5, "y": 5, "content": "keep me"}],
            "originX": 12.5,
            "createdAt": 77
        }]}),
        0,
    );
    let note = &loaded.notes[0];
    assert_eq!(note.id, "n1");
    assert_eq!(note.lines.len(), 1);
    assert_eq!(note.lines[0].object_id, "a");
    assert_eq!(note.text_items[0].content, "keep me");
    assert_eq!(note.origin_x, 12.5);
    assert_eq!(note.created_at, 77);
    assert_eq!(loaded.skipped_notes, 0);
    assert_eq!(loaded.dropped_items, 1);
}

#[test]
fn mistyped_list_is_dropped_alone() {
    let loaded = decode_value(&json!({"notes": [{"id": 5, "lines": "bad", "images": []}]}), 0);
    assert_eq!(loaded.notes.len(), 1);
    assert_eq!(loaded.notes[0].id, "5");
    assert!(loaded.notes[0].lines.is_empty());
    assert_eq!(loaded.dropped_items, 1);
}

#[test]
fn index_out_of_range_is_clamped() {
    let loaded = decode_value(&json!({"notes": [{"id": "a"}, {"id": "b"}], "currentNoteIndex": 7}), 0);
    assert_eq!(loaded.current_note_index, 1);
}

#[test]
fn bad_transform_is_repaired() {
    let loaded = decode_value(&json!({"transform": {"zoomLevel": 0, "panX": "x"}}), 0);
    assert_eq!(loaded.transform, Some(Camera::default()));
    let loaded = decode_value(&json!({"transform": {"zoomLevel": 9, "panX": 3}}), 0);
    let cam = loaded.transform.unwrap();
    assert_eq!(cam.zoom, crate::consts::MAX_ZOOM);
    assert_eq!(cam.pan_x, 3.0);
}

#[test]
fn loaded_notes_get_missing_ids() {
    let loaded = decode_value(
        &json!({"notes": [{"lines": [{"points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]}]}]}),
        42,
    );
    let note = &loaded.notes[0];
    assert_eq!(note.id, "42");
    assert!(!note.lines[0].object_id.is_empty());
}

#[test]
fn notes_without_ids_get_distinct_ids() {
    let loaded = decode_value(&json!({"notes": [{"lines": []}, {"lines": []}]}), 42);
    assert_eq!(loaded.notes[0].id, "42");
    assert_eq!(loaded.notes[1].id, "43");
}

#[test]
fn repeated_note_id_is_replaced() {
    let loaded = decode_value(&json!({"notes": [{"id": "500"}, {"id": "500"}, {}]}), 42);
    let ids: Vec<&str> = loaded.notes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["500", "501", "502"]);
}

// =============================================================
// Legacy migration
// =============================================================

#[test]
fn legacy_layout_becomes_one_note() {
    let legacy = json!({
        "lines": [
            {"points": [{"x": 0, "y": 0}, {"x": 9, "y": 9}], "color": "#fff", "width": 2, "objectId": "o1"},
            {"points": "garbage"}
        ],
        "textItems": [{"id": "t", "x": 1, "y": 2, "text": "hello", "color": "#fff"}],
        "images": [],
    });
    let loaded = decode_value(&legacy, 1_234);
    assert!(loaded.migrated);
    assert_eq!(loaded.notes.len(), 1);
    assert_eq!(loaded.current_note_index, 0);
    let note = &loaded.notes[0];
    assert_eq!(note.id, "1234");
    assert_eq!(note.lines.len(), 1);
    assert_eq!(note.lines[0].object_id, "o1");
    assert_eq!(note.text_items[0].content, "hello");
    assert_eq!(note.created_at, 1_234);
}

#[test]
fn notes_array_wins_over_legacy_keys() {
    let loaded = decode_value(&json!({"notes": [{"id": "a"}], "lines": []}), 0);
    assert!(!loaded.migrated);
    assert_eq!(loaded.notes[0].id, "a");
}

// =============================================================
// Restore / clean slate
// =============================================================

#[test]
fn restore_keeps_index_and_transform() {
    let camera = Camera { zoom: 2.0, ..Camera::default() };
    let loaded = Loaded {
        notes: vec![note_with_stroke("a"), note_with_stroke("b")],
        current_note_index: 1,
        transform: Some(camera),
        ..Loaded::default()
    };
    let restored = restore(loaded, blank);
    assert_eq!(restored.notebook.current().id, "b");
    assert_eq!(restored.camera, camera);
    assert!(!restored.clean_slate);
}

#[test]
fn restore_of_nothing_has_one_fresh_note() {
    let restored = restore(Loaded::default(), blank);
    assert_eq!(restored.notebook.len(), 1);
    assert_eq!(restored.notebook.current().id, "fresh");
}

#[test]
fn clean_slate_appends_blank_note_and_ignores_transform() {
    let loaded = Loaded {
        notes: vec![note_with_stroke("a"), note_with_stroke("b")],
        current_note_index: 0,
        settings: Settings { open_with_clean_slate: true, ..Settings::default() },
        transform: Some(Camera { zoom: 3.0, ..Camera::default() }),
        ..Loaded::default()
    };
    let restored = restore(loaded, blank);
    assert!(restored.clean_slate);
    assert_eq!(restored.notebook.len(), 3);
    assert_eq!(restored.notebook.current_index(), 2);
    assert!(restored.notebook.current().is_empty());
    assert_eq!(restored.camera, Camera::default());
    assert_eq!(restored.notebook.get(0).unwrap().id, "a");
}
