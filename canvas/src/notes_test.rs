use super::*;
use crate::camera::Point;
use crate::doc::Stroke;

fn blank(id: &str) -> Note {
    Note::new(id, Point::new(0.0, 0.0), 0)
}

fn with_stroke(id: &str) -> Note {
    let mut n = blank(id);
    n.add_stroke(Stroke::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], "#fff", 2.0, "o", None));
    n
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_notebook_has_one_note() {
    let book = Notebook::new(blank("a"));
    assert_eq!(book.len(), 1);
    assert!(!book.is_empty());
    assert_eq!(book.current_index(), 0);
    assert_eq!(book.current().id, "a");
}

#[test]
fn from_parts_never_empty() {
    let book = Notebook::from_parts(Vec::new(), 3, || blank("fresh"));
    assert_eq!(book.len(), 1);
    assert_eq!(book.current().id, "fresh");
}

#[test]
fn from_parts_clamps_index() {
    let book = Notebook::from_parts(vec![blank("a"), blank("b")], 9, || blank("x"));
    assert_eq!(book.current_index(), 1);
}

// =============================================================
// Navigation
// =============================================================

#[test]
fn previous_at_first_note_is_noop() {
    let mut book = Notebook::new(blank("a"));
    assert!(!book.previous(10));
    assert_eq!(book.current_index(), 0);
}

#[test]
fn next_at_end_creates_a_note() {
    let mut book = Notebook::new(blank("a"));
    book.next(10, || blank("b"));
    assert_eq!(book.len(), 2);
    assert_eq!(book.current_index(), 1);
    assert_eq!(book.current().id, "b");
}

#[test]
fn next_moves_to_existing_note_without_creating() {
    let mut book = Notebook::from_parts(vec![blank("a"), blank("b")], 0, || blank("x"));
    book.next(10, || blank("never"));
    assert_eq!(book.len(), 2);
    assert_eq!(book.current().id, "b");
}

#[test]
fn leaving_a_note_touches_it() {
    let mut book = Notebook::new(blank("a"));
    book.next(77, || blank("b"));
    assert_eq!(book.get(0).unwrap().last_modified, 77);
    assert!(book.previous(99));
    assert_eq!(book.get(1).unwrap().last_modified, 99);
}

#[test]
fn switching_preserves_other_notes() {
    let mut book = Notebook::new(with_stroke("a"));
    let original = book.current().clone();
    book.next(5, || blank("b"));
    book.current_mut().add_stroke(Stroke::new(
        vec![Point::new(9.0, 9.0), Point::new(8.0, 8.0)],
        "#000",
        1.0,
        "z",
        None,
    ));
    book.previous(6);
    assert_eq!(book.current().lines, original.lines);
    assert_eq!(book.current().text_items, original.text_items);
    assert_eq!(book.current().images, original.images);
}

#[test]
fn push_and_switch_appends() {
    let mut book = Notebook::from_parts(vec![blank("a"), blank("b")], 0, || blank("x"));
    book.push_and_switch(blank("c"));
    assert_eq!(book.len(), 3);
    assert_eq!(book.current_index(), 2);
}
