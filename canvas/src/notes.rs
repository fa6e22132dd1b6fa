//! The note container: an ordered, never-empty list of notes and the active index.

#[cfg(test)]
#[path = "notes_test.rs"]
mod notes_test;

use tracing::debug;

use crate::doc::Note;

/// Ordered notes plus the index of the one being shown.
///
/// Invariant: `notes` is never empty and `current < notes.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    notes: Vec<Note>,
    current: usize,
}

impl Notebook {
    /// A notebook holding just `first`.
    #[must_use]
    pub fn new(first: Note) -> Self {
        Self { notes: vec![first], current: 0 }
    }

    /// Rebuild from loaded parts. An empty list gets `fallback` as its only
    /// note; an out-of-range index is clamped.
    pub fn from_parts(mut notes: Vec<Note>, current: usize, fallback: impl FnOnce() -> Note) -> Self {
        if notes.is_empty() {
            notes.push(fallback());
        }
        let current = current.min(notes.len() - 1);
        Self { notes, current }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    #[must_use]
    pub fn current(&self) -> &Note {
        &self.notes[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Note {
        &mut self.notes[self.current]
    }

    /// Move to the previous note. Returns false at the first note.
    pub fn previous(&mut self, now_ms: i64) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current_mut().touch(now_ms);
        self.current -= 1;
        debug!(index = self.current, count = self.notes.len(), "switched to previous note");
        true
    }

    /// Move to the next note, appending one from `make_note` when already at the end.
    pub fn next(&mut self, now_ms: i64, make_note: impl FnOnce() -> Note) {
        self.current_mut().touch(now_ms);
        if self.current + 1 < self.notes.len() {
            self.current += 1;
            debug!(index = self.current, count = self.notes.len(), "switched to next note");
        } else {
            self.push_and_switch(make_note());
        }
    }

    /// Append `note` and make it current.
    pub fn push_and_switch(&mut self, note: Note) {
        self.notes.push(note);
        self.current = self.notes.len() - 1;
        debug!(index = self.current, count = self.notes.len(), "created note");
    }
}
