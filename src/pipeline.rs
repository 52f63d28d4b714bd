//! Ingestion pipeline orchestration.
//!
//! Wires the scanner, the extraction worker pool and the result sink
//! together around two bounded queues:
//!
//! ```text
//! Scanner ──▶ work queue ──▶ N workers ──▶ result queue ──▶ sink ──▶ Store
//!             (WorkItem)     (OCR on the    (ExtractionResult)  (one task,
//!                             blocking pool)                     serial writes)
//! ```
//!
//! Workers and the sink live as long as the [`Pipeline`]. Scans can be
//! started any number of times in between. Two ways to stop:
//!
//! - [`Pipeline::finish`] closes the work queue and waits until everything
//!   already queued has been extracted and written.
//! - [`Pipeline::shutdown`] signals every task to stop now; queued work is
//!   abandoned and picked up again by the next scan.
//!
//! A failed extraction is logged and skipped; no result is produced, so the
//! stored timestamp stays old and the next scan retries the file. A failed
//! store write is logged and the result dropped.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::Extractor;
use crate::models::{ExtractionResult, PipelineReport, ScanReport, WorkItem};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::scanner::{Scanner, TraversalPolicy};
use crate::store::Store;

/// Emit an `Indexed` progress event every this many stored results.
const PROGRESS_EVERY: u64 = 25;

/// Sizing and policy for a [`Pipeline`].
#[derive(Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub queue_depth: usize,
    pub policy: TraversalPolicy,
    pub progress: Arc<dyn ProgressReporter>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers,
            queue_depth: workers,
            policy: TraversalPolicy::default(),
            progress: Arc::new(NoProgress),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            workers: config.workers.effective_count(),
            queue_depth: config.workers.effective_queue_depth(),
            policy: TraversalPolicy::from_config(&config.scan)?,
            progress: Arc::new(NoProgress),
        })
    }
}

#[derive(Debug, Default)]
struct Counters {
    extracted: AtomicU64,
    failed: AtomicU64,
    stored: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineReport {
        PipelineReport {
            extracted: self.extracted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// A running scanner + worker pool + result sink.
pub struct Pipeline {
    store: Store,
    scanner: Scanner,
    work_tx: mpsc::Sender<WorkItem>,
    workers: Vec<JoinHandle<()>>,
    sink: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    counters: Arc<Counters>,
    progress: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    /// Spawn the workers and the sink. Must be called inside a tokio runtime.
    pub fn start(store: Store, extractor: Arc<dyn Extractor>, options: PipelineOptions) -> Self {
        let worker_count = options.workers.max(1);
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>(options.queue_depth.max(1));
        let (result_tx, result_rx) = mpsc::channel::<ExtractionResult>(worker_count * 2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let work_rx = Arc::new(Mutex::new(work_rx));
        let workers = (0..worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    work_rx: Arc::clone(&work_rx),
                    result_tx: result_tx.clone(),
                    extractor: Arc::clone(&extractor),
                    shutdown: shutdown_rx.clone(),
                    counters: Arc::clone(&counters),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        // Workers own the only result senders; the sink ends when they do.
        drop(result_tx);

        let sink = ResultSink {
            result_rx,
            store: store.clone(),
            shutdown: shutdown_rx,
            counters: Arc::clone(&counters),
            progress: Arc::clone(&options.progress),
        };
        let sink = tokio::spawn(sink.run());

        let scanner = Scanner::new(store.clone(), work_tx.clone(), options.policy)
            .with_progress(Arc::clone(&options.progress));

        tracing::info!(
            workers = worker_count,
            queue_depth = options.queue_depth.max(1),
            engine = extractor.name(),
            "pipeline started"
        );

        Self {
            store,
            scanner,
            work_tx,
            workers,
            sink,
            shutdown_tx,
            counters,
            progress: options.progress,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Scan `roots` and queue every new or changed image. Returns when the
    /// traversal is done; extraction continues in the background.
    pub async fn scan(&self, roots: &[PathBuf]) -> ScanReport {
        self.scanner.scan(roots).await
    }

    /// Scan every registered folder again.
    pub async fn rescan_all(&self) -> Result<ScanReport> {
        self.scanner.rescan_all().await
    }

    /// Counters so far.
    pub fn report(&self) -> PipelineReport {
        self.counters.snapshot()
    }

    /// Close the work queue, let the workers and the sink drain it, and
    /// return the final counters.
    pub async fn finish(self) -> PipelineReport {
        let Pipeline {
            scanner,
            work_tx,
            workers,
            sink,
            shutdown_tx,
            counters,
            progress,
            ..
        } = self;

        drop(scanner);
        drop(work_tx);
        join_all(workers, sink).await;
        drop(shutdown_tx);

        let report = counters.snapshot();
        progress.report(ProgressEvent::Indexed { n: report.stored });
        tracing::info!(
            extracted = report.extracted,
            failed = report.failed,
            stored = report.stored,
            dropped = report.dropped,
            "pipeline drained"
        );
        report
    }

    /// Stop all tasks without draining the queues.
    pub async fn shutdown(self) -> PipelineReport {
        let Pipeline {
            workers,
            sink,
            shutdown_tx,
            counters,
            ..
        } = self;

        let _ = shutdown_tx.send(true);
        join_all(workers, sink).await;

        let report = counters.snapshot();
        tracing::info!(stored = report.stored, "pipeline shut down");
        report
    }
}

async fn join_all(workers: Vec<JoinHandle<()>>, sink: JoinHandle<()>) {
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "worker task failed");
        }
    }
    if let Err(e) = sink.await {
        tracing::error!(error = %e, "result sink task failed");
    }
}

struct Worker {
    id: usize,
    work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    result_tx: mpsc::Sender<ExtractionResult>,
    extractor: Arc<dyn Extractor>,
    shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!(worker = self.id, "worker started");

        loop {
            let item = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                item = next_item(&self.work_rx) => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            let WorkItem { path, mtime } = item;
            let engine = Arc::clone(&self.extractor);
            let job_path = path.clone();
            let job = tokio::task::spawn_blocking(move || engine.extract(&job_path));

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                joined = job => joined.unwrap_or_else(|_| Err(ExtractError::Panicked(path.clone()))),
            };

            match outcome {
                Ok(text) => {
                    self.counters.extracted.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        worker = self.id,
                        path = %path.display(),
                        chars = text.len(),
                        "extracted"
                    );
                    let result = ExtractionResult {
                        path,
                        text,
                        mtime,
                        extracted_at: chrono::Utc::now(),
                    };
                    if self.result_tx.send(result).await.is_err() {
                        tracing::warn!(worker = self.id, "result queue closed");
                        break;
                    }
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        worker = self.id,
                        path = %path.display(),
                        error = %e,
                        "extraction failed"
                    );
                }
            }
        }

        tracing::debug!(worker = self.id, "worker stopped");
    }
}

async fn next_item(work_rx: &Mutex<mpsc::Receiver<WorkItem>>) -> Option<WorkItem> {
    work_rx.lock().await.recv().await
}

struct ResultSink {
    result_rx: mpsc::Receiver<ExtractionResult>,
    store: Store,
    shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
    progress: Arc<dyn ProgressReporter>,
}

impl ResultSink {
    async fn run(mut self) {
        loop {
            let result = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                result = self.result_rx.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
            };

            let path = result.path.to_string_lossy();
            match self
                .store
                .upsert(&path, &result.text, None, result.mtime)
                .await
            {
                Ok(doc) => {
                    let n = self.counters.stored.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(
                        id = doc.id,
                        path = %doc.path,
                        extracted_at = %result.extracted_at,
                        "stored"
                    );
                    if n % PROGRESS_EVERY == 0 {
                        self.progress.report(ProgressEvent::Indexed { n });
                    }
                }
                Err(e) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(path = %path, error = %e, "store write failed, result dropped");
                }
            }
        }
    }
}
