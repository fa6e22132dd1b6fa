//! Persistence service: the notebook blob store and debounced autosave.
//!
//! DESIGN
//! ======
//! The whole notebook is one JSON blob. `BlobStore` reads and writes it;
//! `FileBlobStore` writes a temp file next to the target and renames it into
//! place so a crash mid-write never leaves a truncated document.
//!
//! `AutoSaver` tracks one save deadline. Each request pushes the deadline
//! out by the debounce period, so a burst of edits produces a single write
//! once input has been quiet. The saver never holds the notebook: the
//! session encodes it only when the deadline passes or at shutdown.
//!
//! A blob that could not be read in full is never overwritten in place.
//! `quarantine` moves it aside (`data.json.corrupt`, then `.corrupt.1`, ...)
//! before the first write replaces it.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged and the session keeps running; the next edit
//! schedules another attempt.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::services::export;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage for the single notebook blob.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The stored blob, or `None` when nothing has been saved yet.
    async fn read(&self) -> Result<Option<String>, StoreError>;
    async fn write(&self, blob: &str) -> Result<(), StoreError>;
    /// Move the stored blob out of the way without deleting it.
    /// Returns `false` when there was nothing to move.
    async fn quarantine(&self) -> Result<bool, StoreError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// First `<name>.corrupt[.N]` that does not exist yet.
    async fn free_quarantine_path(&self) -> Result<PathBuf, StoreError> {
        let mut candidate = self.sibling(".corrupt");
        let mut n = 1;
        while tokio::fs::try_exists(&candidate).await.map_err(|e| self.io_error(e))? {
            candidate = self.sibling(&format!(".corrupt.{n}"));
            n += 1;
        }
        Ok(candidate)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn write(&self, blob: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        let temp = self.sibling(".tmp");
        tokio::fs::write(&temp, blob).await.map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| self.io_error(e))?;
        Ok(())
    }

    async fn quarantine(&self) -> Result<bool, StoreError> {
        let target = self.free_quarantine_path().await?;
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => {
                warn!(from = %self.path.display(), to = %target.display(), "kept unreadable notebook aside");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<String>>,
    quarantined: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new(initial: Option<String>) -> Self {
        Self { blob: Mutex::new(initial), ..Self::default() }
    }

    /// The blob most recently moved aside by `quarantine`.
    pub async fn quarantined(&self) -> Option<String> {
        self.quarantined.lock().await.clone()
    }

    /// Number of completed writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.lock().await.clone())
    }

    async fn write(&self, blob: &str) -> Result<(), StoreError> {
        *self.blob.lock().await = Some(blob.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn quarantine(&self) -> Result<bool, StoreError> {
        let Some(blob) = self.blob.lock().await.take() else {
            return Ok(false);
        };
        *self.quarantined.lock().await = Some(blob);
        Ok(true)
    }
}

// =============================================================================
// AUTOSAVE
// =============================================================================

/// One save: the notebook blob plus, with auto-export on, the active note.
#[derive(Debug, Clone)]
pub struct SaveJob {
    pub payload: String,
    pub export: Option<NoteExport>,
}

/// A note serialized for the export folder.
#[derive(Debug, Clone)]
pub struct NoteExport {
    pub note_id: String,
    pub json: String,
}

/// Debounced writer for the notebook blob.
pub struct AutoSaver {
    store: Arc<dyn BlobStore>,
    export_dir: PathBuf,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl AutoSaver {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, export_dir: PathBuf, debounce: Duration) -> Self {
        info!(debounce_ms = debounce.as_millis(), "autosave configured");
        Self { store, export_dir, debounce, deadline: None }
    }

    /// Whether unsaved changes are waiting for their quiet period to end.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending save falls due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|due| due <= now)
    }

    /// (Re)start the quiet period.
    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.debounce);
    }

    /// Forget the pending save.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Write `job` now and clear the pending save. Returns whether the
    /// notebook blob was stored.
    pub async fn flush(&mut self, job: SaveJob) -> bool {
        self.deadline = None;
        run_job(self.store.as_ref(), &self.export_dir, job).await
    }
}

async fn run_job(store: &dyn BlobStore, export_dir: &Path, job: SaveJob) -> bool {
    let stored = match store.write(&job.payload).await {
        Ok(()) => {
            debug!(bytes = job.payload.len(), "notebook saved");
            true
        }
        Err(e) => {
            error!(error = %e, "notebook save failed");
            false
        }
    };
    if let Some(note) = job.export {
        if let Err(e) = export::write_note_json(export_dir, &note.note_id, &note.json).await {
            error!(error = %e, note_id = %note.note_id, "auto-export failed");
        }
    }
    stored
}
