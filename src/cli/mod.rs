use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ConfigLoader, ConfigPaths, CONFIG_ENV, DATA_ENV};
use crate::storage::{self, Persistence, RuntimeContext};
use crate::store::NoteStore;

pub mod commands;

use self::commands::{IdArgs, ListArgs, NewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "smart-notes",
    version,
    about = "Keyboard-first notes with folders, pinning and live search"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over SMART_NOTES_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over SMART_NOTES_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Keep notes in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a note
    New(NewArgs),
    /// Print notes matching a search query and folder
    List(ListArgs),
    /// Print the folder list
    Folders,
    /// Print one note in full
    Show(IdArgs),
    /// Toggle the pinned flag of a note
    Pin(IdArgs),
    /// Delete a note
    Delete(IdArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    File,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let target = match command {
        Commands::Tui => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, target, &paths)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let config = loader.load_or_init()?;
    let store = open_store(&paths, &config, cli.ephemeral)?;
    tracing::info!(
        notes = store.notes().len(),
        persistent = store.is_persistent(),
        "note store ready"
    );

    let config = Arc::new(config);
    match command {
        Commands::Tui => commands::run_tui(config, store),
        Commands::New(args) => commands::new_note(store, args),
        Commands::List(args) => commands::list_notes(store, args),
        Commands::Folders => commands::list_folders(&store),
        Commands::Show(args) => commands::show_note(&store, &args),
        Commands::Pin(args) => commands::toggle_pin(store, &args),
        Commands::Delete(args) => commands::delete_note(store, &args),
    }
}

fn open_store(paths: &ConfigPaths, config: &AppConfig, ephemeral: bool) -> Result<NoteStore> {
    let context = RuntimeContext::detect(ephemeral || !config.storage.persist);
    tracing::info!(%context, "resolved runtime context");
    let persistence = match context {
        RuntimeContext::Interactive => {
            let backend =
                storage::init(paths, &config.storage).context("opening note storage")?;
            Persistence::new(context, backend)
        }
        RuntimeContext::Headless => Persistence::in_memory(),
    };
    Ok(NoteStore::new(persistence))
}

fn init_tracing(level: &str, target: LogTarget, paths: &ConfigPaths) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            LogTarget::File => {
                fs::create_dir_all(&paths.log_dir).with_context(|| {
                    format!("creating log directory {}", paths.log_dir.display())
                })?;
                let log_file = paths.log_file();
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
                    .with_context(|| format!("opening log file {}", log_file.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
