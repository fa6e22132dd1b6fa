//! Export service: per-note JSON files, PNG snapshots, and handing paths to
//! the OS opener.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use base64::Engine;
use canvas::doc::Note;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("note encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid image data: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("could not launch opener for {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io { path: path.to_path_buf(), source }
}

/// File name a note is exported under.
#[must_use]
pub fn note_file_name(note_id: &str) -> String {
    format!("note-{note_id}.json")
}

/// Write an already-serialized note into `dir`, creating it if needed.
pub async fn write_note_json(dir: &Path, note_id: &str, json: &str) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
    let path = dir.join(note_file_name(note_id));
    tokio::fs::write(&path, json).await.map_err(io_error(&path))?;
    debug!(path = %path.display(), "note exported");
    Ok(path)
}

/// Serialize a note and export it into `dir`.
pub async fn export_note(dir: &Path, note: &Note) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(note)?;
    write_note_json(dir, &note.id, &json).await
}

// =============================================================================
// PNG
// =============================================================================

/// Outcome of a PNG export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngExport {
    Saved(PathBuf),
    /// No destination was chosen.
    Canceled,
}

/// Decode a PNG `data:` URL (or bare base64) to bytes.
pub fn decode_png_data_url(data_url: &str) -> Result<Vec<u8>, ExportError> {
    let payload = data_url.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(data_url);
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Write a PNG data URL to `destination`; `None` means the save was canceled.
pub async fn export_png(data_url: &str, destination: Option<&Path>) -> Result<PngExport, ExportError> {
    let Some(path) = destination else {
        return Ok(PngExport::Canceled);
    };
    let bytes = decode_png_data_url(data_url)?;
    tokio::fs::write(path, &bytes).await.map_err(io_error(path))?;
    info!(path = %path.display(), bytes = bytes.len(), "png exported");
    Ok(PngExport::Saved(path.to_path_buf()))
}

// =============================================================================
// OPENER
// =============================================================================

/// Hands paths to whatever opens files on this platform.
pub trait Launcher: Send + Sync {
    fn launch(&self, path: &Path) -> Result<(), ExportError>;
}

/// Runs an opener program with the path as its only argument: `open` on
/// macOS, `xdg-open` elsewhere. Must be used inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: String,
}

impl Default for SystemLauncher {
    fn default() -> Self {
        let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
        Self::with_program(program)
    }
}

impl SystemLauncher {
    #[must_use]
    pub fn with_program(program: &str) -> Self {
        Self { program: program.to_owned() }
    }

    /// Start the opener and reap it in the background. The handle resolves to
    /// the exit status, or `None` if waiting failed.
    fn spawn(&self, path: &Path) -> Result<JoinHandle<Option<ExitStatus>>, ExportError> {
        let mut child = tokio::process::Command::new(&self.program)
            .arg(path)
            .spawn()
            .map_err(|source| ExportError::Launch { path: path.to_path_buf(), source })?;
        let shown = path.display().to_string();
        Ok(tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    if status.success() {
                        debug!(path = %shown, "opener finished");
                    } else {
                        warn!(path = %shown, %status, "opener failed");
                    }
                    Some(status)
                }
                Err(e) => {
                    warn!(path = %shown, error = %e, "could not wait for opener");
                    None
                }
            }
        }))
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, path: &Path) -> Result<(), ExportError> {
        self.spawn(path).map(drop)
    }
}

/// Create the export folder if needed and open it.
pub async fn open_folder(dir: &Path, launcher: &dyn Launcher) -> Result<(), ExportError> {
    tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
    launcher.launch(dir)
}

/// Open an attachment. Missing files are ignored; returns whether it was launched.
pub async fn open_file(path: &Path, launcher: &dyn Launcher) -> Result<bool, ExportError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "open skipped; file missing");
        return Ok(false);
    }
    launcher.launch(path)?;
    Ok(true)
}
