//! Scan, rescan and sweep commands.
//!
//! Each command opens the store, runs the pipeline until its queues are
//! drained, and prints a summary on stdout in the same `key: value` shape
//! for every command, ending in `ok`.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::extract;
use crate::models::{PipelineReport, ScanReport};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::progress::ProgressMode;
use crate::store::Store;

/// What to scan.
#[derive(Debug, Clone)]
pub enum ScanTarget {
    Folders(Vec<PathBuf>),
    KnownFolders,
}

pub async fn run_scan(
    config: &Config,
    target: ScanTarget,
    workers: Option<usize>,
    progress: ProgressMode,
) -> Result<()> {
    let store = Store::open(config).await?;

    let mut options = PipelineOptions::from_config(config)?;
    if let Some(n) = workers {
        options.workers = n.max(1);
        if config.workers.queue_depth == 0 {
            options.queue_depth = options.workers;
        }
    }
    options.progress = progress.reporter();

    let pipeline = Pipeline::start(store.clone(), extract::from_config(&config.ocr), options);

    let scan = match target {
        ScanTarget::Folders(folders) => pipeline.scan(&folders).await,
        ScanTarget::KnownFolders => match pipeline.rescan_all().await {
            Ok(scan) => scan,
            Err(e) => {
                pipeline.shutdown().await;
                store.close().await;
                return Err(e);
            }
        },
    };
    let report = pipeline.finish().await;

    print_summary(&scan, &report);
    store.close().await;
    Ok(())
}

fn print_summary(scan: &ScanReport, report: &PipelineReport) {
    println!("scan");
    println!("  roots: {}", scan.roots);
    println!("  images found: {}", scan.matched);
    println!("  queued: {}", scan.queued);
    println!("  unchanged: {}", scan.unchanged);
    println!("  scan errors: {}", scan.errors);
    println!("  extracted: {}", report.extracted);
    println!("  failed: {}", report.failed);
    println!("  stored: {}", report.stored);
    if report.dropped > 0 {
        println!("  dropped: {}", report.dropped);
    }
    println!("ok");
}

pub async fn run_sweep(store: &Store) -> Result<()> {
    let report = store.sweep().await?;
    println!("sweep");
    println!("  checked: {}", report.checked);
    println!("  removed: {}", report.removed);
    println!("ok");
    Ok(())
}
