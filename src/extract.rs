//! OCR text extraction.
//!
//! The pipeline treats the OCR engine as a black box behind [`Extractor`]:
//! give it a path, get text back or an [`ExtractError`]. Calls are
//! synchronous and may take seconds; workers run them on tokio's blocking
//! pool.
//!
//! [`Tesseract`] shells out to the `tesseract` binary, which is safe to call
//! from many workers at once since each call is its own process. Engines
//! that are not thread-safe can be wrapped in [`Serialized`].

use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use crate::config::OcrConfig;
use crate::error::ExtractError;

/// Image formats the scanner picks up and the extractor accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "gif"];

/// Case-insensitive suffix check against [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Turns an image file into text.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Runs `<command> <image> stdout -l <language>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct Tesseract {
    command: String,
    language: String,
}

impl Tesseract {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.command, &config.language)
    }
}

impl Extractor for Tesseract {
    fn name(&self) -> &str {
        &self.command
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if !is_supported_image(path) {
            return Err(ExtractError::Unsupported(path.to_path_buf()));
        }
        if let Err(source) = std::fs::metadata(path) {
            return Err(ExtractError::Io {
                path: path.to_path_buf(),
                source,
            });
        }

        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|source| ExtractError::EngineUnavailable {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Engine {
                path: path.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(normalize_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Trim trailing whitespace per line and drop the blank lines OCR engines
/// like to pad their output with.
fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lets only one extraction run at a time through the wrapped engine.
pub struct Serialized<E> {
    inner: Mutex<E>,
    name: String,
}

impl<E: Extractor> Serialized<E> {
    pub fn new(inner: E) -> Self {
        let name = format!("serialized({})", inner.name());
        Self {
            inner: Mutex::new(inner),
            name,
        }
    }
}

impl<E: Extractor> Extractor for Serialized<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        // A panic inside a previous call poisons the lock; the engine itself
        // holds no state we could have corrupted, so keep going.
        let engine = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        engine.extract(path)
    }
}

/// Build the extractor described by the `[ocr]` config section.
pub fn from_config(config: &OcrConfig) -> Arc<dyn Extractor> {
    let engine = Tesseract::from_config(config);
    if config.serialize {
        Arc::new(Serialized::new(engine))
    } else {
        Arc::new(engine)
    }
}
