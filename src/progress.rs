//! Scan and indexing progress reporting.
//!
//! Reports what is being scanned, how many files were queued per root, and
//! how many results have been written, so a long OCR run is observable.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Traversal of this root has started.
    Scanning { root: String },
    /// Traversal of this root finished.
    Scanned {
        root: String,
        matched: u64,
        queued: u64,
    },
    /// `n` results have been written to the store so far.
    Indexed { n: u64 },
}

impl ProgressEvent {
    pub fn scanning(root: &Path) -> Self {
        ProgressEvent::Scanning {
            root: root.display().to_string(),
        }
    }
}

/// Receives progress events from the scanner and the result sink.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "scan /data/pics  12 / 1,034 queued".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Scanning { root } => format!("scan {}  walking...\n", root),
            ProgressEvent::Scanned {
                root,
                matched,
                queued,
            } => format!(
                "scan {}  {} / {} images queued\n",
                root,
                format_number(*queued),
                format_number(*matched)
            ),
            ProgressEvent::Indexed { n } => format!("index  {} stored\n", format_number(*n)),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Scanning { root } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "root": root,
            }),
            ProgressEvent::Scanned {
                root,
                matched,
                queued,
            } => serde_json::json!({
                "event": "progress",
                "phase": "scanned",
                "root": root,
                "matched": matched,
                "queued": queued,
            }),
            ProgressEvent::Indexed { n } => serde_json::json!({
                "event": "progress",
                "phase": "indexed",
                "n": n,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Arc<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(StderrProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn scanning_event_carries_display_path() {
        assert_eq!(
            ProgressEvent::scanning(Path::new("/data/pics")),
            ProgressEvent::Scanning {
                root: "/data/pics".to_string()
            }
        );
    }
}
