//! Session state: one engine plus the host services its actions need.
//!
//! DESIGN
//! ======
//! `Session` owns the `EngineCore` and turns the `Action`s it returns into
//! effects: redraw counts, debounced saves, clipboard reads, file opens.
//! Actions are drained from a queue because some (a paste request) produce
//! further actions.
//!
//! A save request only moves the autosave deadline. The notebook is encoded
//! when the deadline passes, which the session checks before each event and
//! while idling through a `wait`. Shutdown writes only if a save is pending.
//!
//! A stored notebook that did not decode cleanly is moved aside by the
//! store before the first save replaces it; loading alone never writes.
//!
//! The session clock is wall time at start plus elapsed `tokio` time, so
//! replays under a paused test runtime are deterministic.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use canvas::camera::Point;
use canvas::clipboard::{SystemClip, SystemClipboard};
use canvas::engine::{Action, EngineCore};
use canvas::input::{Key, WheelDelta};
use canvas::persist::{self, PersistError};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::script::ScriptEvent;
use crate::services::export::{self, Launcher};
use crate::services::persistence::{AutoSaver, BlobStore, NoteExport, SaveJob, StoreError};

/// Canvas size used until a script sets one.
pub const DEFAULT_VIEWPORT: (f64, f64) = (1280.0, 800.0);

/// System clipboard fed by replay scripts.
#[derive(Debug, Default)]
pub struct ScriptedClipboard {
    content: Option<SystemClip>,
}

impl ScriptedClipboard {
    pub fn set(&mut self, content: Option<SystemClip>) {
        self.content = content;
    }
}

impl SystemClipboard for ScriptedClipboard {
    fn read(&mut self) -> Option<SystemClip> {
        self.content.clone()
    }
}

/// One-line description of a note for `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub index: usize,
    pub id: String,
    pub objects: usize,
    pub strokes: usize,
    pub text_items: usize,
    pub images: usize,
    pub attachments: usize,
    pub last_modified: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookSummary {
    pub current_note_index: usize,
    pub notes: Vec<NoteSummary>,
}

/// Counters for what the session did, reported after a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub events: usize,
    pub renders: usize,
    pub saves_requested: usize,
    pub saves_written: usize,
    pub files_opened: usize,
}

pub struct Session {
    engine: EngineCore,
    store: Arc<dyn BlobStore>,
    autosave: AutoSaver,
    clipboard: ScriptedClipboard,
    launcher: Arc<dyn Launcher>,
    export_dir: PathBuf,
    started_ms: i64,
    started: tokio::time::Instant,
    stats: SessionStats,
    /// The stored blob lost data on load and must be kept before overwriting.
    keep_stored_blob: bool,
}

impl Session {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, launcher: Arc<dyn Launcher>, export_dir: PathBuf, debounce: Duration) -> Self {
        let started_ms = wall_clock_ms();
        let mut engine = EngineCore::new(started_ms);
        engine.set_viewport(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1);
        let autosave = AutoSaver::new(Arc::clone(&store), export_dir.clone(), debounce);
        Self {
            engine,
            store,
            autosave,
            clipboard: ScriptedClipboard::default(),
            launcher,
            export_dir,
            started_ms,
            started: tokio::time::Instant::now(),
            stats: SessionStats::default(),
            keep_stored_blob: false,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.started_ms.saturating_add(elapsed)
    }

    /// Load the stored notebook. An unreadable blob starts a fresh notebook
    /// and stays in the store until the first save.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let Some(text) = self.store.read().await? else {
            info!("no saved notebook; starting fresh");
            return Ok(());
        };
        let now = self.now_ms();
        match persist::decode(&text, now) {
            Ok(loaded) => {
                if loaded.is_lossy() {
                    warn!(
                        skipped_notes = loaded.skipped_notes,
                        dropped_items = loaded.dropped_items,
                        "part of the saved notebook could not be read"
                    );
                    self.keep_stored_blob = true;
                }
                let actions = self.engine.load(loaded, now);
                self.dispatch(actions).await;
            }
            Err(e) => {
                warn!(error = %e, "saved notebook is malformed; starting fresh");
                self.keep_stored_blob = true;
            }
        }
        Ok(())
    }

    /// Feed one input event to the engine and carry out the resulting actions.
    pub async fn apply(&mut self, event: ScriptEvent) {
        self.stats.events += 1;
        if self.autosave.is_due(tokio::time::Instant::now()) {
            self.save_now().await;
        }
        let now = self.now_ms();
        let engine = &mut self.engine;
        let actions = match event {
            ScriptEvent::Viewport { width, height } => engine.set_viewport(width, height),
            ScriptEvent::PointerDown { x, y, button, mods } => engine.on_pointer_down(Point::new(x, y), button, mods, now),
            ScriptEvent::PointerMove { x, y, mods } => engine.on_pointer_move(Point::new(x, y), mods, now),
            ScriptEvent::PointerUp { x, y, button, mods } => engine.on_pointer_up(Point::new(x, y), button, mods, now),
            ScriptEvent::DoubleClick { x, y } => engine.on_double_click(Point::new(x, y), now),
            ScriptEvent::Wheel { x, y, dx, dy, mods } => engine.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, mods),
            ScriptEvent::GestureStart => {
                engine.on_gesture_start();
                Vec::new()
            }
            ScriptEvent::GestureChange { scale, rotation } => engine.on_gesture_change(scale, rotation),
            ScriptEvent::GestureEnd => {
                engine.on_gesture_end();
                Vec::new()
            }
            ScriptEvent::Key { key, mods } => engine.on_key_down(&Key(key), mods, now),
            ScriptEvent::Tool { tool } => engine.set_tool(tool.into(), now),
            ScriptEvent::Color { color } => engine.set_color(&color, now),
            ScriptEvent::StrokeWidth { width } => {
                engine.set_stroke_width(width);
                Vec::new()
            }
            ScriptEvent::Text { content } => match engine.ui.editing_text.clone() {
                Some(id) => engine.set_text_content(&id, &content, now),
                None => {
                    warn!("text event with no text item being edited");
                    Vec::new()
                }
            },
            ScriptEvent::EndText => engine.end_text_edit(now),
            ScriptEvent::Format { mark } => engine.toggle_text_format(mark, now),
            ScriptEvent::Clipboard { text, image } => {
                let image = image.map(|i| (i.data_url, i.width, i.height));
                self.clipboard.set(SystemClip::pick(image, text));
                Vec::new()
            }
            ScriptEvent::Paste => vec![Action::PasteRequested],
            ScriptEvent::PasteHere { x, y } => engine.paste_system_at(Point::new(x, y), now),
            ScriptEvent::Focus { focused } => {
                let clip = if focused { self.clipboard.read() } else { None };
                engine.on_focus_changed(focused, clip, now)
            }
            ScriptEvent::ToggleOpen => engine.on_toggled_open(now),
            ScriptEvent::DropFile { x, y, path, name, file_type } => {
                engine.drop_file(Point::new(x, y), &path, &name, &file_type, now)
            }
            ScriptEvent::DropImage { x, y, data_url, width, height } => {
                engine.drop_image(Point::new(x, y), &data_url, width, height, now)
            }
            ScriptEvent::Settings { settings } => engine.update_settings(settings),
            ScriptEvent::ClearNote => engine.clear_note(now),
            ScriptEvent::ToggleFreeze => engine.toggle_freeze(),
            ScriptEvent::Wait { ms } => {
                self.idle(Duration::from_millis(ms)).await;
                Vec::new()
            }
        };
        self.dispatch(actions).await;
    }

    async fn dispatch(&mut self, actions: Vec<Action>) {
        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::RenderNeeded => self.stats.renders += 1,
                Action::SaveRequested => {
                    self.stats.saves_requested += 1;
                    self.autosave.schedule();
                }
                Action::PasteRequested => {
                    let clip = self.clipboard.read();
                    let now = self.now_ms();
                    queue.extend(self.engine.smart_paste(clip, now));
                }
                Action::OpenFile(path) => match export::open_file(Path::new(&path), self.launcher.as_ref()).await {
                    Ok(true) => self.stats.files_opened += 1,
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, path = %path, "could not open attachment"),
                },
                Action::NoteChanged { index, count } => info!(index, count, "note changed"),
                Action::ToolChanged(tool) => debug!(?tool, "tool changed"),
                Action::ShowPasteOverlay { at } => debug!(x = at.x, y = at.y, "paste overlay shown"),
                Action::HidePasteOverlay => debug!("paste overlay hidden"),
                Action::FocusText { id } => debug!(%id, "text editor focused"),
                Action::OpacityChanged(opacity) => debug!(opacity, "background opacity"),
            }
        }
    }

    fn save_job(&self) -> Result<SaveJob, PersistError> {
        let payload = self.engine.payload().to_json()?;
        let export = if self.engine.settings.auto_export {
            let note = self.engine.note();
            Some(NoteExport { note_id: note.id.clone(), json: serde_json::to_string_pretty(note)? })
        } else {
            None
        };
        Ok(SaveJob { payload, export })
    }

    /// Let `period` pass, saving whenever the autosave deadline falls inside it.
    async fn idle(&mut self, period: Duration) {
        let end = tokio::time::Instant::now() + period;
        while let Some(due) = self.autosave.deadline().filter(|due| *due <= end) {
            tokio::time::sleep_until(due).await;
            self.save_now().await;
        }
        tokio::time::sleep_until(end).await;
    }

    /// Encode the notebook and write it, moving a damaged stored blob aside
    /// first. A failed move leaves the blob alone and retries after the next
    /// quiet period.
    async fn save_now(&mut self) {
        self.autosave.cancel();
        if self.keep_stored_blob {
            match self.store.quarantine().await {
                Ok(moved) => {
                    info!(moved, "unreadable notebook set aside before saving");
                    self.keep_stored_blob = false;
                }
                Err(e) => {
                    error!(error = %e, "could not set the unreadable notebook aside; not saving");
                    self.autosave.schedule();
                    return;
                }
            }
        }
        match self.save_job() {
            Ok(job) => {
                if self.autosave.flush(job).await {
                    self.stats.saves_written += 1;
                }
            }
            Err(e) => warn!(error = %e, "could not encode notebook"),
        }
    }

    /// Write the pending save, if any.
    pub async fn shutdown(&mut self) {
        if self.autosave.is_pending() {
            debug!("flushing notebook");
            self.save_now().await;
        } else {
            debug!("nothing to save");
        }
    }

    #[must_use]
    pub fn summary(&self) -> NotebookSummary {
        let notebook = &self.engine.notebook;
        let notes = notebook
            .notes()
            .iter()
            .enumerate()
            .map(|(index, note)| NoteSummary {
                index,
                id: note.id.clone(),
                objects: note.object_ids().len(),
                strokes: note.lines.len(),
                text_items: note.text_items.len(),
                images: note.images.len(),
                attachments: note.attachments.len(),
                last_modified: note.last_modified,
            })
            .collect();
        NotebookSummary { current_note_index: notebook.current_index(), notes }
    }
}

fn wall_clock_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
