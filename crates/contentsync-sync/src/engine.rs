//! One-way synchronization driver
//!
//! [`SyncEngine`] diffs a source tree against a destination and applies the
//! categories enabled by a [`SyncPolicy`] through [`FileOps`], one phase at a
//! time, counting every success and failure into a [`SyncReport`].

use crate::cache::{normalize_root, DiskListingCache, ListingCache};
use crate::compare::ContentComparator;
use crate::diff::{DiffEngine, DiffOptions, FolderDiffResult};
use crate::fileops::FileOps;
use crate::progress::{PhaseTimer, SyncPhase};
use crate::report::SyncReport;
use crate::scan::TreeScanner;
use contentsync_config::{Config, SyncPolicy};
use contentsync_types::{ChunkSize, Error, PathCase, PathSet, RelativePath, Result, WorkerCount};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tuning knobs for a [`SyncEngine`]
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Path comparison mode
    pub case: PathCase,
    /// Descend into symbolic links to directories
    pub follow_symlinks: bool,
    /// Comparisons in flight at once
    pub max_workers: WorkerCount,
    /// Read size for content comparison
    pub chunk_size: ChunkSize,
    /// Copy modification times onto copied files
    pub preserve_timestamps: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            case: PathCase::default(),
            follow_symlinks: false,
            max_workers: WorkerCount::default(),
            chunk_size: ChunkSize::default(),
            preserve_timestamps: true,
        }
    }
}

impl EngineOptions {
    /// Options from the scan and performance sections of `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            case: config.scan.path_case(),
            follow_symlinks: config.scan.follow_symlinks,
            max_workers: config.performance.max_workers,
            chunk_size: config.performance.compare_chunk_size,
            preserve_timestamps: config.performance.preserve_timestamps,
        }
    }
}

/// Applies a [`SyncPolicy`] to a source/destination pair
#[derive(Debug, Clone)]
pub struct SyncEngine {
    diff: DiffEngine,
    cache: Option<Arc<dyn ListingCache>>,
    options: EngineOptions,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(None, EngineOptions::default())
    }
}

impl SyncEngine {
    /// Create an engine, optionally backed by a listing cache
    pub fn new(cache: Option<Arc<dyn ListingCache>>, options: EngineOptions) -> Self {
        let mut scanner = TreeScanner::new()
            .with_case(options.case)
            .with_follow_symlinks(options.follow_symlinks);
        if let Some(cache) = &cache {
            scanner = scanner.with_cache(Arc::clone(cache));
        }
        let diff = DiffEngine::new(scanner, ContentComparator::new(options.chunk_size))
            .with_max_workers(options.max_workers);

        Self {
            diff,
            cache,
            options,
        }
    }

    /// Create an engine from configuration, opening the disk cache when enabled
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache: Option<Arc<dyn ListingCache>> = if config.cache.enabled {
            let directory = config.cache.resolved_directory();
            let cache = DiskListingCache::new(&directory)?.with_max_age(config.cache.max_age());
            debug!("Using listing cache at {}", directory.display());
            Some(Arc::new(cache))
        } else {
            None
        };
        Ok(Self::new(cache, EngineOptions::from_config(config)))
    }

    /// Diff engine used for the comparison step
    pub fn diff_engine(&self) -> &DiffEngine {
        &self.diff
    }

    /// Attached listing cache
    pub fn cache(&self) -> Option<&Arc<dyn ListingCache>> {
        self.cache.as_ref()
    }

    /// Engine options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Synchronize the `destination` tree with `source`
    ///
    /// Only a missing source, an unusable pattern, a failed scan or a
    /// destination root that cannot be created end in `Err`. Failures on
    /// individual items are counted in the report and the run carries on.
    /// Cancellation stops the run early and is reported, not returned as an
    /// error.
    pub async fn sync(
        &self,
        source: &Path,
        destination: &Path,
        policy: &SyncPolicy,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let started = Instant::now();
        let timer = PhaseTimer::new();
        let mut report = SyncReport::new(
            source.to_path_buf(),
            destination.to_path_buf(),
            policy.dry_run,
        );
        report.deleted_identical = policy.delete_identical;

        if !tokio::fs::metadata(source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(Error::scan(source, "source directory does not exist"));
        }

        let ops = FileOps::new(policy.dry_run)
            .with_preserve_timestamps(self.options.preserve_timestamps);
        let mut view = DestinationView::new(destination, policy.dry_run, self.options.case);

        if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
            if policy.dry_run {
                info!("Would create {}", destination.display());
            } else {
                info!("Create {}", destination.display());
                tokio::fs::create_dir_all(destination).await.map_err(|e| {
                    Error::file_op("create directory", destination, e.to_string())
                })?;
            }
        }

        if !policy.dry_run {
            if let Some(cache) = &self.cache {
                cache.mark_written(normalize_root(destination));
            }
        }

        info!(
            run_id = %report.run_id,
            "Syncing {} to {}{}",
            source.display(),
            destination.display(),
            if policy.dry_run { " (dry run)" } else { "" }
        );

        let options = DiffOptions::from_policy(policy);
        match self
            .diff
            .diff_timed(source, destination, &options, cancel, &timer)
            .await
        {
            Ok(diff) => {
                let roots = (source, destination);
                Self::apply(&diff, roots, policy, &ops, &mut view, cancel, &timer, &mut report)
                    .await;
            }
            Err(Error::Cancelled) => {
                info!("Cancelled while comparing, no changes made");
                report.cancelled = true;
            }
            Err(e) => return Err(e),
        }

        self.finish(&mut report, &timer, started);
        Ok(report)
    }

    /// Synchronize a single file
    ///
    /// Nothing is copied when `destination` exists with the same contents.
    /// A failed comparison is counted and the copy goes ahead.
    pub async fn sync_file(
        &self,
        source: &Path,
        destination: &Path,
        policy: &SyncPolicy,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let started = Instant::now();
        let timer = PhaseTimer::new();
        let mut report = SyncReport::new(
            source.to_path_buf(),
            destination.to_path_buf(),
            policy.dry_run,
        );

        if !tokio::fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(Error::scan(source, "source file does not exist"));
        }

        let destination_is_file = tokio::fs::metadata(destination)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        if destination_is_file {
            let comparator = self.diff.comparator().clone();
            let (left, right, token) = (
                source.to_path_buf(),
                destination.to_path_buf(),
                cancel.clone(),
            );
            let outcome = {
                let _section = timer.section(SyncPhase::Comparing);
                tokio::task::spawn_blocking(move || comparator.are_identical(&left, &right, &token))
                    .await
                    .map_err(|e| Error::other(format!("Comparison task failed: {}", e)))?
            };

            match outcome {
                Ok(true) => {
                    info!("File contents are identical.");
                    report.contents_identical = true;
                    report.fully_identical = true;
                    report.identical_files = 1;
                    self.finish(&mut report, &timer, started);
                    return Ok(report);
                }
                Ok(false) => {}
                Err(e) if e.aborts_run() => return Err(e),
                Err(e) => {
                    error!("{}", e);
                    report.counters.comparisons_failed += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            report.cancelled = true;
        } else {
            let ops = FileOps::new(policy.dry_run)
                .with_preserve_timestamps(self.options.preserve_timestamps);
            let _section = timer.section(SyncPhase::CopyingNewFiles);
            report.changes_made = true;
            if ops.copy_file(source, destination).await {
                if destination_is_file {
                    report.counters.files_updated += 1;
                } else {
                    report.counters.files_copied += 1;
                }
            } else {
                report.counters.files_failed_to_copy += 1;
            }
        }

        self.finish(&mut report, &timer, started);
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply(
        diff: &FolderDiffResult,
        (source, destination): (&Path, &Path),
        policy: &SyncPolicy,
        ops: &FileOps,
        view: &mut DestinationView,
        cancel: &CancellationToken,
        timer: &PhaseTimer,
        report: &mut SyncReport,
    ) {
        report.identical_files = diff.identical_files.len() as u64;
        report.fully_identical = diff.are_fully_identical();
        report.counters.comparisons_failed = diff.failed_comparisons.len() as u64;

        if policy.copy_left_only && !diff.left_only_files.is_empty() {
            let _section = timer.section(SyncPhase::CopyingNewFiles);
            for path in &diff.left_only_files {
                if stop(cancel, report) {
                    break;
                }
                report.changes_made = true;
                if ops
                    .copy_file(&path.resolve(source), &path.resolve(destination))
                    .await
                {
                    report.counters.files_copied += 1;
                    view.note_file_written(path);
                } else {
                    report.counters.files_failed_to_copy += 1;
                }
            }
        }

        if policy.update_changed && !diff.changed_files.is_empty() {
            let _section = timer.section(SyncPhase::UpdatingChangedFiles);
            for path in &diff.changed_files {
                if stop(cancel, report) {
                    break;
                }
                report.changes_made = true;
                if ops
                    .copy_file(&path.resolve(source), &path.resolve(destination))
                    .await
                {
                    report.counters.files_updated += 1;
                } else {
                    report.counters.files_failed_to_copy += 1;
                }
            }
        } else if policy.deletes_changed() && !diff.changed_files.is_empty() {
            let _section = timer.section(SyncPhase::DeletingChangedFiles);
            for path in &diff.changed_files {
                if stop(cancel, report) {
                    break;
                }
                report.changes_made = true;
                if ops.delete_file(&path.resolve(destination)).await {
                    report.counters.changed_files_deleted += 1;
                } else {
                    report.counters.files_failed_to_delete += 1;
                }
            }
        }

        if policy.delete_identical && !diff.identical_files.is_empty() {
            let _section = timer.section(SyncPhase::DeletingIdenticalFiles);
            for path in &diff.identical_files {
                if stop(cancel, report) {
                    break;
                }
                report.changes_made = true;
                if ops.delete_file(&path.resolve(destination)).await {
                    report.counters.identical_files_deleted += 1;
                } else {
                    report.counters.files_failed_to_delete += 1;
                }
            }
        }

        if policy.delete_right_only_files && !diff.right_only_files.is_empty() {
            let _section = timer.section(SyncPhase::DeletingExtraFiles);
            for path in &diff.right_only_files {
                if stop(cancel, report) {
                    break;
                }
                report.changes_made = true;
                if ops.delete_file(&path.resolve(destination)).await {
                    report.counters.right_only_files_deleted += 1;
                } else {
                    report.counters.files_failed_to_delete += 1;
                }
            }
        }

        if policy.create_empty_folders && !diff.left_only_folders.is_empty() {
            let _section = timer.section(SyncPhase::CreatingFolders);
            for path in &diff.left_only_folders {
                if stop(cancel, report) {
                    break;
                }
                if view.dir_exists(path).await {
                    continue;
                }
                report.changes_made = true;
                if ops.create_directory(&path.resolve(destination)).await {
                    report.counters.folders_created += 1;
                    view.note_dir_created(path);
                } else {
                    report.counters.folders_failed_to_create += 1;
                }
            }
        }

        if policy.delete_right_only_folders && !diff.right_only_folders.is_empty() {
            let _section = timer.section(SyncPhase::DeletingFolders);
            for path in &diff.right_only_folders {
                if stop(cancel, report) {
                    break;
                }
                if !view.dir_exists(path).await {
                    continue;
                }
                report.changes_made = true;
                if ops.delete_directory(&path.resolve(destination)).await {
                    report.counters.folders_deleted += 1;
                    view.note_dir_deleted(path);
                } else {
                    report.counters.folders_failed_to_delete += 1;
                }
            }
        }
    }

    fn finish(&self, report: &mut SyncReport, timer: &PhaseTimer, started: Instant) {
        if report.counters.has_failures() {
            info!(
                "{} failures, keeping cached listings for a retry",
                report.counters.total_failures()
            );
        } else if let Some(cache) = &self.cache {
            match cache.clear_written_entries() {
                Ok(removed) => {
                    debug!("Dropped {} stale cached listings", removed);
                    report.cache_cleared = true;
                }
                Err(e) => warn!("Unable to clear cached listings: {}", e),
            }
        }

        report.timings = timer.timings();
        report.duration = started.elapsed();

        for line in report.summary_lines() {
            debug!("{}", line.text);
        }
        info!(
            run_id = %report.run_id,
            "Finished in {:?}: {} changes, {} failures",
            report.duration,
            report.counters.total_changes(),
            report.counters.total_failures()
        );
    }
}

fn stop(cancel: &CancellationToken, report: &mut SyncReport) -> bool {
    if cancel.is_cancelled() {
        if !report.cancelled {
            info!("Cancellation requested, skipping remaining operations");
        }
        report.cancelled = true;
        return true;
    }
    false
}

/// Existence checks against the destination, with the effects of a dry run
/// layered on top so it sees what a real run would see
#[derive(Debug)]
struct DestinationView {
    root: PathBuf,
    speculative: bool,
    created: PathSet,
    deleted: PathSet,
}

impl DestinationView {
    fn new(root: &Path, speculative: bool, case: PathCase) -> Self {
        Self {
            root: root.to_path_buf(),
            speculative,
            created: PathSet::new(case),
            deleted: PathSet::new(case),
        }
    }

    fn note_file_written(&mut self, file: &RelativePath) {
        if let Some(parent) = file.parent() {
            self.note_dir_created(&parent);
        }
    }

    fn note_dir_created(&mut self, dir: &RelativePath) {
        if !self.speculative {
            return;
        }
        let mut current = Some(dir.clone());
        while let Some(path) = current {
            if path.is_empty() {
                break;
            }
            current = path.parent();
            self.created.insert(path);
        }
    }

    fn note_dir_deleted(&mut self, dir: &RelativePath) {
        if self.speculative {
            self.deleted.insert(dir.clone());
        }
    }

    async fn dir_exists(&self, dir: &RelativePath) -> bool {
        if self.speculative {
            let case = self.deleted.case();
            if self.deleted.iter().any(|gone| dir.starts_with(gone, case)) {
                return false;
            }
            if self.created.contains(dir) {
                return true;
            }
        }
        tokio::fs::metadata(dir.resolve(&self.root))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
