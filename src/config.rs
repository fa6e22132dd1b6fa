//! Host configuration loaded from environment variables.
//!
//! Every knob has a default so the binary runs with no environment at all.
//! Numeric values that fail to parse fall back to their defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

const DATA_FILE_NAME: &str = "floatnote-data.json";
const EXPORT_DIR_NAME: &str = ".floatnote";
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where the whole notebook is persisted.
    pub data_file: PathBuf,
    /// Folder for per-note exports.
    pub export_dir: PathBuf,
    /// Quiet period before a requested save is written.
    pub autosave_debounce: Duration,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let data_file = env_path("FLOATNOTE_DATA_FILE").unwrap_or_else(default_data_file);
        let export_dir = env_path("FLOATNOTE_EXPORT_DIR").unwrap_or_else(default_export_dir);
        let debounce_ms = env_parse("FLOATNOTE_AUTOSAVE_DEBOUNCE_MS", DEFAULT_AUTOSAVE_DEBOUNCE_MS);
        Self { data_file, export_dir, autosave_debounce: Duration::from_millis(debounce_ms) }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn home_dir() -> PathBuf {
    env_path("HOME").unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_file() -> PathBuf {
    let base = env_path("XDG_DATA_HOME").unwrap_or_else(|| home_dir().join(".local").join("share"));
    base.join("floatnote").join(DATA_FILE_NAME)
}

fn default_export_dir() -> PathBuf {
    home_dir().join(EXPORT_DIR_NAME)
}
