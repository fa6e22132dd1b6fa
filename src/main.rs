//! `floatnote` host binary.
//!
//! Drives the canvas engine headlessly: replays scripted input against the
//! stored notebook, reports what is in it, and runs the export commands the
//! overlay window exposes.

mod config;
mod script;
mod services;
mod state;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::services::export::{self, ExportError, PngExport, SystemLauncher};
use crate::services::persistence::{BlobStore, FileBlobStore, MemoryBlobStore, StoreError};
use crate::state::Session;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("script line {line}: {source}")]
    Script { line: usize, source: serde_json::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no note at index {0}")]
    NoSuchNote(usize),
}

#[derive(Parser, Debug)]
#[command(name = "floatnote", about = "Floating note canvas, driven from the command line")]
struct Cli {
    #[arg(long, env = "FLOATNOTE_DATA_FILE")]
    data_file: Option<PathBuf>,

    #[arg(long, env = "FLOATNOTE_EXPORT_DIR")]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of the stored notebook.
    Info,
    /// Apply JSON-lines input events to the stored notebook, then save.
    Replay {
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
        #[arg(long, default_value_t = false, help = "Replay against a copy; leave the data file untouched")]
        dry_run: bool,
    },
    /// Write one note to the export folder as JSON.
    ExportNote {
        #[arg(long, help = "Note index; defaults to the current note")]
        index: Option<usize>,
    },
    /// Open the export folder with the system opener.
    OpenFolder,
    /// Decode a PNG data URL and write it out.
    ExportPng {
        #[arg(long, help = "File holding the data URL")]
        input: PathBuf,
        #[arg(long, help = "Destination; omitted means the export is canceled")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(data_file) = cli.data_file {
        config.data_file = data_file;
    }
    if let Some(export_dir) = cli.export_dir {
        config.export_dir = export_dir;
    }

    match cli.command {
        Command::Info => run_info(&config).await,
        Command::Replay { input, dry_run } => run_replay(&config, &input, dry_run).await,
        Command::ExportNote { index } => run_export_note(&config, index).await,
        Command::OpenFolder => {
            export::open_folder(&config.export_dir, &SystemLauncher::default()).await?;
            Ok(())
        }
        Command::ExportPng { input, output } => run_export_png(&input, output).await,
    }
}

async fn open_session(config: &Config) -> Result<Session, AppError> {
    let file = FileBlobStore::new(&config.data_file);
    info!(path = %file.path().display(), "opening notebook");
    open_session_with(config, Arc::new(file)).await
}

async fn open_session_with(config: &Config, store: Arc<dyn BlobStore>) -> Result<Session, AppError> {
    let launcher = Arc::new(SystemLauncher::default());
    let mut session = Session::new(store, launcher, config.export_dir.clone(), config.autosave_debounce);
    session.load().await?;
    Ok(session)
}

async fn run_info(config: &Config) -> Result<(), AppError> {
    let session = open_session(config).await?;
    print_json(&session.summary())
}

async fn run_replay(config: &Config, input: &str, dry_run: bool) -> Result<(), AppError> {
    let mut session = if dry_run {
        let seed = FileBlobStore::new(&config.data_file).read().await?;
        open_session_with(config, Arc::new(MemoryBlobStore::new(seed))).await?
    } else {
        open_session(config).await?
    };
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let event = script::parse_line(&line).map_err(|source| AppError::Script { line: index + 1, source })?;
        if let Some(event) = event {
            session.apply(event).await;
        }
    }
    session.shutdown().await;

    let stats = session.stats();
    info!(
        events = stats.events,
        renders = stats.renders,
        saves_requested = stats.saves_requested,
        saves_written = stats.saves_written,
        "replay finished"
    );
    print_json(&session.summary())
}

async fn run_export_note(config: &Config, index: Option<usize>) -> Result<(), AppError> {
    let session = open_session(config).await?;
    let notebook = &session.engine().notebook;
    let index = index.unwrap_or_else(|| notebook.current_index());
    let note = notebook.get(index).ok_or(AppError::NoSuchNote(index))?;
    let path = export::export_note(session.export_dir(), note).await?;
    println!("{}", path.display());
    Ok(())
}

async fn run_export_png(input: &Path, output: Option<PathBuf>) -> Result<(), AppError> {
    let data_url = tokio::fs::read_to_string(input).await?;
    match export::export_png(data_url.trim(), output.as_deref()).await? {
        PngExport::Saved(path) => println!("{}", path.display()),
        PngExport::Canceled => println!("canceled"),
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
