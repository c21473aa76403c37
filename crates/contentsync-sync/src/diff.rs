//! Classification of two trees into diff categories

use crate::compare::ContentComparator;
use crate::progress::{PhaseTimer, SyncPhase};
use crate::scan::TreeScanner;
use contentsync_config::SyncPolicy;
use contentsync_types::{Error, PathCase, PathSet, RelativePath, Result, TreeListing, WorkerCount};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Inputs that shape a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Glob matched against file names
    pub pattern: String,
    /// Walk the full subtree instead of the top level only
    pub recursive: bool,
    /// Read file contents when both sides have a file
    pub compare_contents: bool,
    /// Let modification times decide the tie-break
    pub respect_date: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            pattern: SyncPolicy::MATCH_ALL.to_string(),
            recursive: true,
            compare_contents: false,
            respect_date: true,
        }
    }
}

impl DiffOptions {
    /// Options implied by a sync policy
    pub fn from_policy(policy: &SyncPolicy) -> Self {
        Self {
            pattern: policy.pattern.clone(),
            recursive: policy.recursive,
            compare_contents: policy.compare_contents(),
            respect_date: policy.respect_date,
        }
    }

    /// Set the file name pattern
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Walk recursively or top-level only
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Enable or disable content comparison
    pub fn with_compare_contents(mut self, compare_contents: bool) -> Self {
        self.compare_contents = compare_contents;
        self
    }

    /// Enable or disable the modification-time tie-break
    pub fn with_respect_date(mut self, respect_date: bool) -> Self {
        self.respect_date = respect_date;
        self
    }
}

/// Categorized differences between a left (source) and right tree
///
/// Every sequence is deduplicated under the scan's case mode and sorted
/// ascending. A file present on both sides lands in at most one of the
/// changed and identical categories. A pair whose comparison failed is listed
/// in `failed_comparisons` and its destination path stays right-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDiffResult {
    /// Files present only on the left
    pub left_only_files: Vec<RelativePath>,
    /// Files present on both sides and judged the same
    pub identical_files: Vec<RelativePath>,
    /// Files present on both sides and judged different
    pub changed_files: Vec<RelativePath>,
    /// Files present only on the right, in the right's spelling
    pub right_only_files: Vec<RelativePath>,
    /// Folders present only on the left
    pub left_only_folders: Vec<RelativePath>,
    /// Folders present only on the right
    pub right_only_folders: Vec<RelativePath>,
    /// Pairs that could not be compared
    pub failed_comparisons: Vec<RelativePath>,
}

impl FolderDiffResult {
    /// Whether every category other than identical files is empty
    pub fn are_fully_identical(&self) -> bool {
        self.left_only_files.is_empty()
            && self.changed_files.is_empty()
            && self.right_only_files.is_empty()
            && self.left_only_folders.is_empty()
            && self.right_only_folders.is_empty()
    }
}

/// Computes a [`FolderDiffResult`] for two roots
#[derive(Debug, Clone)]
pub struct DiffEngine {
    scanner: TreeScanner,
    comparator: ContentComparator,
    max_workers: WorkerCount,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(TreeScanner::new(), ContentComparator::default())
    }
}

impl DiffEngine {
    /// Create a diff engine
    pub fn new(scanner: TreeScanner, comparator: ContentComparator) -> Self {
        Self {
            scanner,
            comparator,
            max_workers: WorkerCount::default(),
        }
    }

    /// Bound the number of comparisons in flight
    pub fn with_max_workers(mut self, max_workers: WorkerCount) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Scanner used for both roots
    pub fn scanner(&self) -> &TreeScanner {
        &self.scanner
    }

    /// Comparator shared by every comparison task
    pub fn comparator(&self) -> &ContentComparator {
        &self.comparator
    }

    /// Diff `left` against `right`
    pub async fn diff(
        &self,
        left: &Path,
        right: &Path,
        options: &DiffOptions,
        cancel: &CancellationToken,
    ) -> Result<FolderDiffResult> {
        self.diff_timed(left, right, options, cancel, &PhaseTimer::new())
            .await
    }

    /// Diff `left` against `right`, recording phase timings
    ///
    /// `left` must exist. A missing `right` is treated as empty. Once
    /// `cancel` fires no further comparisons are started, in-flight ones
    /// finish their current chunk and the diff returns
    /// [`Error::Cancelled`].
    pub async fn diff_timed(
        &self,
        left: &Path,
        right: &Path,
        options: &DiffOptions,
        cancel: &CancellationToken,
        timer: &PhaseTimer,
    ) -> Result<FolderDiffResult> {
        if !tokio::fs::try_exists(left).await.unwrap_or(false) {
            return Err(Error::scan(left, "directory does not exist"));
        }

        let left_listing = {
            let _section = timer.section(SyncPhase::ScanningSource);
            self.scan(left, options, cancel).await?
        };
        let right_listing = {
            let _section = timer.section(SyncPhase::ScanningDestination);
            if tokio::fs::try_exists(right).await.unwrap_or(false) {
                self.scan(right, options, cancel).await?
            } else {
                debug!("{} does not exist, treating it as empty", right.display());
                TreeListing::new()
            }
        };
        info!(
            "Found {} files in {} and {} files in {}",
            left_listing.files.len(),
            left.display(),
            right_listing.files.len(),
            right.display()
        );

        let case = self.scanner.case();
        let left_folders = left_listing.folder_set(case);
        let right_folders = right_listing.folder_set(case);

        let classified = {
            let _section = timer.section(SyncPhase::Comparing);
            self.classify_files(left, right, &left_listing, &right_listing, options, cancel)
                .await?
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let _section = timer.section(SyncPhase::Sorting);
        let result = FolderDiffResult {
            left_only_files: sorted(case, classified.left_only),
            identical_files: sorted(case, classified.identical),
            changed_files: sorted(case, classified.changed),
            right_only_files: classified.right_only.into_sorted_vec(),
            left_only_folders: left_folders.difference(&right_folders),
            right_only_folders: right_folders.difference(&left_folders),
            failed_comparisons: sorted(case, classified.failed),
        };
        Ok(result)
    }

    async fn scan(
        &self,
        root: &Path,
        options: &DiffOptions,
        cancel: &CancellationToken,
    ) -> Result<TreeListing> {
        let scanner = self.scanner.clone();
        let root = root.to_path_buf();
        let pattern = options.pattern.clone();
        let recursive = options.recursive;
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || scanner.scan(&root, &pattern, recursive, &cancel))
            .await
            .map_err(|e| Error::other(format!("Scan task failed: {}", e)))?
    }

    async fn classify_files(
        &self,
        left: &Path,
        right: &Path,
        left_listing: &TreeListing,
        right_listing: &TreeListing,
        options: &DiffOptions,
        cancel: &CancellationToken,
    ) -> Result<Classified> {
        let case = self.scanner.case();
        let mut classified = Classified {
            right_only: right_listing.file_set(case),
            ..Classified::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_workers.get()));
        let mut tasks = JoinSet::new();

        for path in left_listing.file_set(case) {
            if cancel.is_cancelled() {
                debug!("Cancellation requested, no further comparisons scheduled");
                break;
            }

            let Some(right_spelling) = classified.right_only.get(&path).cloned() else {
                classified.left_only.push(path);
                continue;
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::other(format!("Worker pool closed: {}", e)))?;

            let pair = ComparePair {
                left: path.resolve(left),
                right: right_spelling.resolve(right),
                path,
            };
            let comparator = self.comparator.clone();
            let options = options.clone();
            let cancel = cancel.clone();
            tasks.spawn_blocking(move || {
                let outcome = is_same(&pair.left, &pair.right, &options, &comparator, &cancel);
                drop(permit);
                (pair.path, outcome)
            });

            while let Some(joined) = tasks.try_join_next() {
                classified.absorb(joined)?;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            classified.absorb(joined)?;
        }

        Ok(classified)
    }
}

struct ComparePair {
    path: RelativePath,
    left: PathBuf,
    right: PathBuf,
}

#[derive(Default)]
struct Classified {
    left_only: Vec<RelativePath>,
    identical: Vec<RelativePath>,
    changed: Vec<RelativePath>,
    failed: Vec<RelativePath>,
    right_only: PathSet,
}

impl Classified {
    fn absorb(
        &mut self,
        joined: std::result::Result<(RelativePath, Result<bool>), tokio::task::JoinError>,
    ) -> Result<()> {
        let (path, outcome) =
            joined.map_err(|e| Error::other(format!("Comparison task failed: {}", e)))?;
        match outcome {
            Err(e) if e.aborts_run() => return Err(e),
            Ok(same) => {
                self.right_only.remove(&path);
                if same {
                    self.identical.push(path);
                } else {
                    self.changed.push(path);
                }
            }
            Err(e) => {
                error!("{}", e);
                self.failed.push(path);
            }
        }
        Ok(())
    }
}

/// Tie-break deciding whether a pair present on both sides is the same
///
/// When contents are not compared, when they compare equal, or when dates
/// are respected, only `left_mtime <= right_mtime` decides. In the remaining
/// case (contents compared, found different, dates ignored) the pair is
/// reported the same. Existing callers rely on that last case; see DESIGN.md
/// before changing it.
fn is_same(
    left: &Path,
    right: &Path,
    options: &DiffOptions,
    comparator: &ContentComparator,
    cancel: &CancellationToken,
) -> Result<bool> {
    if !options.compare_contents
        || comparator.are_identical(left, right, cancel)?
        || options.respect_date
    {
        Ok(modified(left)? <= modified(right)?)
    } else {
        Ok(true)
    }
}

fn modified(path: &Path) -> Result<std::time::SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| Error::compare(path, e.to_string()))
}

fn sorted(case: PathCase, paths: Vec<RelativePath>) -> Vec<RelativePath> {
    PathSet::from_paths(case, paths).into_sorted_vec()
}
