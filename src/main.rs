//! # Memex CLI (`memex`)
//!
//! The `memex` binary indexes the text inside images and searches it.
//!
//! ## Usage
//!
//! ```bash
//! memex [--base-dir DIR] [--config FILE] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `memex init` | Create the SQLite database and run schema migrations |
//! | `memex scan <folder>...` | Walk folders and OCR new or changed images |
//! | `memex rescan` | Scan every previously registered folder again |
//! | `memex search "<query>"` | Full-text search over OCR text and comments |
//! | `memex get <id>` | Print one indexed image |
//! | `memex comment <id> "<text>"` | Attach a comment to an image |
//! | `memex folders` | List registered folders |
//! | `memex sweep` | Drop rows whose image file no longer exists |
//! | `memex stats` | Database summary |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use memex::config;
use memex::folders;
use memex::get;
use memex::ingest::{self, ScanTarget};
use memex::logging;
use memex::progress::ProgressMode;
use memex::search;
use memex::stats;
use memex::store::Store;

/// Memex: search your screenshots by what they say.
#[derive(Parser)]
#[command(
    name = "memex",
    about = "Index the text inside images and search it",
    version,
    long_about = "Memex walks folders for images, extracts their text with an OCR engine \
    (tesseract by default) on a pool of workers, and keeps the results in a SQLite full-text \
    index. Only new or modified images are processed on later scans."
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Defaults to `<base-dir>/memex.toml` when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the database, config and log file.
    ///
    /// Defaults to `$MEMEX_HOME`, then `~/.memex.d`.
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Log debug output from memex.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it on an existing database changes nothing.
    Init,

    /// Scan folders for images and index their text.
    ///
    /// Each folder is registered so `memex rescan` can find it again.
    Scan {
        /// Folders to walk.
        #[arg(required = true)]
        folders: Vec<PathBuf>,

        /// Number of OCR workers (defaults to the CPU count).
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Scan every registered folder again.
    Rescan {
        /// Number of OCR workers (defaults to the CPU count).
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Search OCR text and comments.
    ///
    /// Uses SQLite FTS5 query syntax. Results are ordered newest first.
    Search {
        /// The search query string.
        query: String,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print an indexed image by id.
    Get {
        /// Document id.
        id: i64,
    },

    /// Set the comment on an indexed image.
    ///
    /// Comments are searchable and survive re-extraction.
    Comment {
        /// Document id.
        id: i64,

        /// Comment text. An empty string clears the comment.
        text: String,
    },

    /// List registered folders.
    Folders,

    /// Remove documents whose file has been deleted.
    Sweep,

    /// Show database statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(cli.config.as_deref(), cli.base_dir.as_deref())?;
    let _log_guard = logging::init(&cfg, cli.verbose)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Init => {
            let store = Store::open(&cfg).await?;
            store.close().await;
            println!(
                "Database initialized successfully: {}",
                cfg.db_path().display()
            );
        }
        Commands::Scan { folders, workers } => {
            ingest::run_scan(&cfg, ScanTarget::Folders(folders), workers, progress).await?;
        }
        Commands::Rescan { workers } => {
            ingest::run_scan(&cfg, ScanTarget::KnownFolders, workers, progress).await?;
        }
        Commands::Search { query, json, limit } => {
            let store = Store::open(&cfg).await?;
            search::run_search(&store, &query, limit, json).await?;
            store.close().await;
        }
        Commands::Get { id } => {
            let store = Store::open(&cfg).await?;
            get::run_get(&store, id).await?;
            store.close().await;
        }
        Commands::Comment { id, text } => {
            let store = Store::open(&cfg).await?;
            get::run_comment(&store, id, &text).await?;
            store.close().await;
        }
        Commands::Folders => {
            let store = Store::open(&cfg).await?;
            folders::list_folders(&store).await?;
            store.close().await;
        }
        Commands::Sweep => {
            let store = Store::open(&cfg).await?;
            ingest::run_sweep(&store).await?;
            store.close().await;
        }
        Commands::Stats => {
            let store = Store::open(&cfg).await?;
            stats::run_stats(&cfg, &store).await?;
            store.close().await;
        }
    }

    Ok(())
}
