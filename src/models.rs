//! Data types shared across the pipeline.
//!
//! [`Document`] and [`Folder`] mirror rows in the database. [`WorkItem`] and
//! [`ExtractionResult`] are the transient messages passed between pipeline
//! stages and are never persisted themselves.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Image timestamps are unix nanoseconds; folder scan times are seconds.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// One indexed image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: i64,
    /// Absolute path; unique.
    pub path: String,
    /// OCR text. May be empty.
    pub content: String,
    /// User annotation, independent of `content`.
    pub comment: String,
    /// File modification time (unix nanoseconds) when the file was last
    /// indexed.
    pub timestamp: i64,
}

impl Document {
    /// `timestamp` in whole unix seconds, for display.
    pub fn modified_secs(&self) -> i64 {
        self.timestamp.div_euclid(NANOS_PER_SECOND)
    }
}

/// A root directory registered for (re-)scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub id: i64,
    pub path: String,
    /// Unix seconds of the most recent scan of this root.
    pub timestamp: i64,
}

/// A file the scanner found new or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    /// Modification time observed during the scan, unix nanoseconds.
    pub mtime: i64,
}

/// Text extracted from one file, on its way to the result sink.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub path: PathBuf,
    pub text: String,
    /// Carried over from the [`WorkItem`]; this is what gets persisted.
    pub mtime: i64,
    /// Wall-clock time the extraction finished. Informational only.
    pub extracted_at: DateTime<Utc>,
}

/// Outcome of one [`Scanner::scan`](crate::scanner::Scanner::scan) call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub roots: usize,
    /// Files whose name matched a supported image format.
    pub matched: u64,
    /// Files pushed onto the work queue.
    pub queued: u64,
    /// Matched files already indexed at their current mtime.
    pub unchanged: u64,
    /// Walk entries, metadata reads or lookups that failed and were skipped.
    pub errors: u64,
}

impl ScanReport {
    pub fn merge(&mut self, other: &ScanReport) {
        self.roots += other.roots;
        self.matched += other.matched;
        self.queued += other.queued;
        self.unchanged += other.unchanged;
        self.errors += other.errors;
    }
}

/// Totals reported when a [`Pipeline`](crate::pipeline::Pipeline) stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Files with text successfully extracted.
    pub extracted: u64,
    /// Files whose extraction failed; retried on the next scan.
    pub failed: u64,
    /// Results written to the store.
    pub stored: u64,
    /// Results lost because the store write failed.
    pub dropped: u64,
}

/// Row counts from [`Store::stats`](crate::store::Store::stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub documents: i64,
    /// Documents whose OCR text is non-empty.
    pub with_text: i64,
    pub with_comment: i64,
    pub folders: i64,
}

/// Outcome of [`Store::sweep`](crate::store::Store::sweep).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: u64,
    pub removed: u64,
}
