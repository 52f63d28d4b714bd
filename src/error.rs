//! Error types for the two failure classes the pipeline distinguishes.
//!
//! [`ExtractError`] is recoverable and scoped to a single file: the worker
//! that hit it logs the path and moves on. [`InitError`] is fatal and only
//! ever comes out of [`Store::open`](crate::store::Store::open); nothing
//! downstream can run without a usable database.
//!
//! Everything else (store queries, CLI plumbing) uses `anyhow`.

use std::path::PathBuf;

/// Per-file extraction failure. Never terminates a worker.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported image format: {0}")]
    Unsupported(PathBuf),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine '{command}' is not available: {source}")]
    EngineUnavailable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine failed on {path} ({status}): {stderr}")]
    Engine {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("extraction task for {0} panicked")]
    Panicked(PathBuf),
}

/// Store open / schema failure. Aborts pipeline startup.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("cannot create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open database {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema initialization failed: {0}")]
    Schema(#[from] sqlx::Error),
}
