//! Process-wide `tracing` setup for the `memex` binary.
//!
//! Console output goes to stderr so stdout stays clean for search results.
//! When `[log] file = true`, the same events are also appended to
//! `<base_dir>/memex.log` through a non-blocking writer.
//!
//! Level resolution: `MEMEX_LOG`, then `RUST_LOG`, then `[log] level`, with
//! `--verbose` forcing `debug`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LOG_FILE};

pub const LOG_ENV: &str = "MEMEX_LOG";

/// Install the global subscriber. Keep the returned guard alive until exit,
/// otherwise buffered file output is lost.
pub fn init(config: &Config, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = if verbose {
        EnvFilter::new("memex=debug,info")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&config.log.level))
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if config.log.file {
        std::fs::create_dir_all(&config.base_dir).with_context(|| {
            format!("Failed to create directory: {}", config.base_dir.display())
        })?;
        let appender = tracing_appender::rolling::never(&config.base_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}
