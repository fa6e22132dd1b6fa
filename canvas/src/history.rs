//! Per-note undo/redo as a bounded list of snapshots with a cursor.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::MAX_HISTORY_SIZE;
use crate::doc::{ImageItem, Note, Stroke, TextItem};

/// Deep copy of the undoable parts of a note.
///
/// Attachments are not part of undo.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteSnapshot {
    pub lines: Vec<Stroke>,
    pub text_items: Vec<TextItem>,
    pub images: Vec<ImageItem>,
}

/// Snapshot history for the active note.
///
/// `index` points at the entry matching the live note. Saving truncates any
/// redo branch; exceeding `max` evicts the oldest entry and shifts the cursor
/// so the visible state is unaffected.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<NoteSnapshot>,
    index: Option<usize>,
    max: usize,
    restoring: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl History {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self { entries: Vec::new(), index: None, max: max.max(1), restoring: false }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position, `None` before the first save.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        match self.index {
            Some(i) => i + 1 < self.entries.len(),
            None => false,
        }
    }

    /// Record the note's current state. Ignored while a restore is applying.
    pub fn save(&mut self, note: &Note) -> bool {
        if self.restoring {
            return false;
        }
        let keep = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(note.snapshot());
        if self.entries.len() > self.max {
            self.entries.remove(0);
        }
        self.index = Some(self.entries.len() - 1);
        true
    }

    /// Step back one entry and restore it into `note`.
    pub fn undo(&mut self, note: &mut Note) -> bool {
        match self.index {
            Some(i) if i > 0 => self.restore_at(i - 1, note),
            _ => false,
        }
    }

    /// Step forward one entry and restore it into `note`.
    pub fn redo(&mut self, note: &mut Note) -> bool {
        match self.index {
            Some(i) if i + 1 < self.entries.len() => self.restore_at(i + 1, note),
            _ => false,
        }
    }

    fn restore_at(&mut self, index: usize, note: &mut Note) -> bool {
        let Some(snapshot) = self.entries.get(index) else {
            return false;
        };
        self.restoring = true;
        note.restore(snapshot);
        self.restoring = false;
        self.index = Some(index);
        true
    }

    /// Drop every entry and take `note` as the new baseline.
    pub fn reset(&mut self, note: &Note) {
        self.entries.clear();
        self.index = None;
        self.restoring = false;
        self.save(note);
    }
}
