//! Directory scanner with change detection.
//!
//! [`Scanner::scan`] walks every root concurrently, one task per root, and
//! returns once all of them are done. Each root task is split in two halves:
//!
//! ```text
//!  blocking pool                 async task                 work queue
//! ┌──────────────┐  candidates  ┌──────────────────┐  new/  ┌─────────┐
//! │ walkdir over │─────────────▶│ timestamp_of()   │───────▶│ workers │
//! │ root, filter │  (bounded)   │ vs. file mtime   │changed └─────────┘
//! └──────────────┘              └──────────────────┘
//! ```
//!
//! Both channels are bounded, so a slow worker pool throttles the walk
//! instead of letting discovered paths pile up in memory.
//!
//! Per-entry problems (unreadable directories, files that vanish mid-walk,
//! symlink loops, failed lookups) are logged and counted in the
//! [`ScanReport`]; they never abort the traversal.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::extract::is_supported_image;
use crate::models::{ScanReport, WorkItem};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::store::Store;

/// Candidates buffered between the blocking walk and the async lookup.
const CANDIDATE_BUFFER: usize = 64;

/// How a root is traversed.
#[derive(Debug, Clone)]
pub struct TraversalPolicy {
    pub follow_symlinks: bool,
    pub same_file_system: bool,
    pub max_depth: Option<usize>,
    excludes: GlobSet,
}

impl Default for TraversalPolicy {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            same_file_system: false,
            max_depth: None,
            excludes: GlobSet::empty(),
        }
    }
}

impl TraversalPolicy {
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            follow_symlinks: config.follow_symlinks,
            same_file_system: config.same_file_system,
            max_depth: config.max_depth,
            excludes: build_globset(&config.exclude_globs)?,
        })
    }

    fn walker(&self, root: &Path) -> WalkDir {
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .same_file_system(self.same_file_system);
        match self.max_depth {
            Some(depth) => walker.max_depth(depth),
            None => walker,
        }
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.excludes.is_match(relative)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Walks scan roots and feeds new or changed images to the work queue.
#[derive(Clone)]
pub struct Scanner {
    store: Store,
    work_tx: mpsc::Sender<WorkItem>,
    policy: Arc<TraversalPolicy>,
    progress: Arc<dyn ProgressReporter>,
}

impl Scanner {
    pub fn new(store: Store, work_tx: mpsc::Sender<WorkItem>, policy: TraversalPolicy) -> Self {
        Self {
            store,
            work_tx,
            policy: Arc::new(policy),
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Scan all `roots` concurrently and wait for every traversal to finish.
    ///
    /// Duplicate roots are walked once. A root inside another root is only
    /// registered; its files are reached through the enclosing walk.
    pub async fn scan(&self, roots: &[PathBuf]) -> ScanReport {
        let plan = plan_roots(roots);

        let mut tasks = JoinSet::new();
        for root in plan.walk {
            let scanner = self.clone();
            tasks.spawn(async move { scanner.scan_root(root).await });
        }

        let mut report = ScanReport::default();
        for root in &plan.covered {
            let root_str = root.to_string_lossy();
            tracing::debug!(root = %root_str, "covered by an enclosing root");
            report.roots += 1;
            self.register_folder(&root_str, &mut report).await;
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(root_report) => report.merge(&root_report),
                Err(e) => {
                    tracing::error!(error = %e, "scan task failed");
                    report.errors += 1;
                }
            }
        }
        report
    }

    /// Re-scan every root previously registered in the folder table.
    pub async fn rescan_all(&self) -> Result<ScanReport> {
        let roots = self.store.folder_list().await?;
        tracing::info!(roots = roots.len(), "rescanning known folders");
        Ok(self.scan(&roots).await)
    }

    async fn scan_root(&self, root: PathBuf) -> ScanReport {
        let root_str = root.to_string_lossy().to_string();
        let mut report = ScanReport {
            roots: 1,
            ..ScanReport::default()
        };

        self.register_folder(&root_str, &mut report).await;
        self.progress.report(ProgressEvent::scanning(&root));
        tracing::info!(root = %root_str, "scan started");

        let (candidate_tx, mut candidate_rx) = mpsc::channel(CANDIDATE_BUFFER);
        let policy = Arc::clone(&self.policy);
        let walk_root = root.clone();
        let walk =
            tokio::task::spawn_blocking(move || walk_images(&walk_root, &policy, candidate_tx));

        while let Some(item) = candidate_rx.recv().await {
            let mtime = item.mtime;
            // walk_images only forwards UTF-8 paths
            let path_str = item.path.to_string_lossy().into_owned();

            match self.store.timestamp_of(&path_str).await {
                Ok(Some(stored)) if stored >= mtime => {
                    report.unchanged += 1;
                }
                Ok(_) => {
                    tracing::debug!(path = %path_str, mtime, "queued");
                    if self.work_tx.send(item).await.is_err() {
                        tracing::warn!(root = %root_str, "work queue closed, stopping scan");
                        break;
                    }
                    report.queued += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path_str, error = %e, "timestamp lookup failed, skipping");
                    report.errors += 1;
                }
            }
        }
        // Unblocks the walker if we stopped early.
        drop(candidate_rx);

        match walk.await {
            Ok(stats) => {
                report.matched += stats.matched;
                report.errors += stats.errors;
            }
            Err(e) => {
                tracing::error!(root = %root_str, error = %e, "walk task failed");
                report.errors += 1;
            }
        }

        self.register_folder(&root_str, &mut report).await;
        self.progress.report(ProgressEvent::Scanned {
            root: root_str.clone(),
            matched: report.matched,
            queued: report.queued,
        });
        tracing::info!(
            root = %root_str,
            matched = report.matched,
            queued = report.queued,
            unchanged = report.unchanged,
            errors = report.errors,
            "scan finished"
        );

        report
    }

    async fn register_folder(&self, root: &str, report: &mut ScanReport) {
        let now = chrono::Utc::now().timestamp();
        if let Err(e) = self.store.folder_upsert(root, now).await {
            tracing::warn!(%root, error = %e, "cannot record scan folder");
            report.errors += 1;
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RootPlan {
    /// Resolved roots to traverse, no two of them nested.
    walk: Vec<PathBuf>,
    /// Resolved roots lying inside one of `walk`.
    covered: Vec<PathBuf>,
}

fn plan_roots(roots: &[PathBuf]) -> RootPlan {
    // Sorted component-wise, so an ancestor comes before its descendants.
    let resolved: BTreeSet<PathBuf> = roots.iter().map(|r| resolve_root(r)).collect();

    let mut plan = RootPlan::default();
    for root in resolved {
        if plan.walk.iter().any(|outer| root.starts_with(outer)) {
            plan.covered.push(root);
        } else {
            plan.walk.push(root);
        }
    }
    plan
}

/// Absolute form of `root`; canonical when the directory exists.
fn resolve_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

#[derive(Debug, Default)]
struct WalkStats {
    matched: u64,
    errors: u64,
}

/// Runs on the blocking pool. Sends every supported image with its mtime.
fn walk_images(root: &Path, policy: &TraversalPolicy, tx: mpsc::Sender<WorkItem>) -> WalkStats {
    let mut stats = WalkStats::default();

    for entry in policy.walker(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                stats.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_supported_image(path) || policy.is_excluded(root, path) {
            continue;
        }
        stats.matched += 1;

        if path.to_str().is_none() {
            tracing::warn!(path = %path.display(), "skipping non UTF-8 path");
            stats.errors += 1;
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(std::io::Error::from)
            .and_then(|m| m.modified());
        let mtime = match modified {
            Ok(t) => unix_nanos(t),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read mtime, skipping");
                stats.errors += 1;
                continue;
            }
        };

        let item = WorkItem {
            path: path.to_path_buf(),
            mtime,
        };
        if tx.blocking_send(item).is_err() {
            break;
        }
    }

    stats
}

/// Nanoseconds since the unix epoch, saturating outside 1677..2262.
pub fn unix_nanos(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}
