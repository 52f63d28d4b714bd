//! TOML configuration.
//!
//! A [`Config`] is built once at startup and passed by reference to every
//! component. It is never mutated afterwards; paths derived from the base
//! directory (database, log file) are computed on demand.
//!
//! Every section and field has a default, so a missing config file yields a
//! usable configuration rooted at `~/.memex.d`.

use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up inside the base directory.
pub const CONFIG_FILE: &str = "memex.toml";
/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "MEMEX_HOME";
/// Log file name inside the base directory.
pub const LOG_FILE: &str = "memex.log";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Directory holding the database, log file and default config.
    /// Not read from the file; set by [`load_config`].
    #[serde(skip)]
    pub base_dir: PathBuf,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Explicit database location. Defaults to `<base_dir>/memex.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write to `<base_dir>/memex.log`.
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Traversal policy for the directory scanner.
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub same_file_system: bool,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            same_file_system: false,
            max_depth: None,
            exclude_globs: default_exclude_globs(),
        }
    }
}

fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerConfig {
    /// Number of extraction workers; 0 means one per available CPU.
    #[serde(default)]
    pub count: usize,
    /// Capacity of the work queue; 0 means the worker count.
    #[serde(default)]
    pub queue_depth: usize,
}

impl WorkerConfig {
    pub fn effective_count(&self) -> usize {
        if self.count > 0 {
            return self.count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn effective_queue_depth(&self) -> usize {
        if self.queue_depth > 0 {
            self.queue_depth
        } else {
            self.effective_count()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    /// Funnel all extraction calls through a single lock.
    #[serde(default)]
    pub serialize: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: default_ocr_language(),
            serialize: false,
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Config {
    /// Defaults rooted at `base_dir`, as if an empty config file were read.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db
            .path
            .clone()
            .unwrap_or_else(|| self.base_dir.join("memex.db"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join(LOG_FILE)
    }
}

/// `$MEMEX_HOME`, else `~/.memex.d`.
pub fn default_base_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memex.d")
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `<base_dir>/memex.toml` is
/// read if present, otherwise defaults are used.
pub fn load_config(path: Option<&Path>, base_dir: Option<&Path>) -> Result<Config> {
    let base_dir = base_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_base_dir);

    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => {
            let implicit = base_dir.join(CONFIG_FILE);
            if implicit.is_file() {
                parse_file(&implicit)?
            } else {
                Config::default()
            }
        }
    };
    config.base_dir = base_dir;

    validate(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_str(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.ocr.command.trim().is_empty() {
        bail!("ocr.command must not be empty");
    }
    if config.ocr.language.trim().is_empty() {
        bail!("ocr.language must not be empty");
    }
    if config.workers.count > 1024 {
        bail!("workers.count must be <= 1024");
    }
    if config.db.max_connections == 0 {
        bail!("db.max_connections must be >= 1");
    }
    if config.log.level.trim().is_empty() {
        bail!("log.level must not be empty");
    }
    for pattern in &config.scan.exclude_globs {
        Glob::new(pattern).with_context(|| format!("Invalid exclude glob: '{}'", pattern))?;
    }
    Ok(())
}
