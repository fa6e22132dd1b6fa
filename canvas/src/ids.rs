//! Id minting and the stroke grouping policy.
//!
//! Ids are derived from the wall-clock timestamp the caller passes in, bumped
//! past the last issued value so two items created in the same millisecond
//! still get distinct ids.

#[cfg(test)]
#[path = "ids_test.rs"]
mod ids_test;

use crate::consts::OBJECT_GROUP_TIMEOUT_MS;
use crate::doc::ObjectId;

/// Monotonic, time-based id source.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    last: i64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an id no smaller than `now_ms` and strictly greater than every earlier one.
    pub fn mint(&mut self, now_ms: i64) -> String {
        self.last = now_ms.max(self.last + 1);
        self.last.to_string()
    }

    /// Make sure future ids sort after `value`, e.g. after loading saved data.
    pub fn observe(&mut self, value: i64) {
        self.last = self.last.max(value);
    }
}

/// Decides which object a new stroke belongs to.
///
/// A stroke started within [`OBJECT_GROUP_TIMEOUT_MS`] of the previous stroke
/// start joins that stroke's object; otherwise a fresh id is minted.
#[derive(Debug, Clone, Default)]
pub struct ObjectGrouper {
    current: Option<ObjectId>,
    last_start_ms: Option<i64>,
}

impl ObjectGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id for a freehand stroke starting at `now_ms`.
    pub fn stroke_id(&mut self, now_ms: i64, ids: &mut IdGen) -> ObjectId {
        let within_window = self
            .last_start_ms
            .is_some_and(|last| now_ms - last < OBJECT_GROUP_TIMEOUT_MS);
        let id = match (&self.current, within_window) {
            (Some(current), true) => current.clone(),
            _ => ids.mint(now_ms),
        };
        self.current = Some(id.clone());
        self.last_start_ms = Some(now_ms);
        id
    }

    /// Forget the running group so the next stroke starts a new object.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_start_ms = None;
    }
}
