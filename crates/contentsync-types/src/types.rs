//! Core data types for ContentSync

use crate::path::{PathCase, PathSet, RelativePath};

/// Files and folders discovered under one root at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeListing {
    /// Relative file paths matching the scan pattern
    pub files: Vec<RelativePath>,
    /// Relative folder paths, empty for a top-level scan
    pub folders: Vec<RelativePath>,
}

impl TreeListing {
    /// Create an empty listing
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a listing from explicit file and folder sequences
    pub fn with_entries(files: Vec<RelativePath>, folders: Vec<RelativePath>) -> Self {
        Self { files, folders }
    }

    /// Whether the listing has neither files nor folders
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Files as a [`PathSet`] under the given case mode
    pub fn file_set(&self, case: PathCase) -> PathSet {
        PathSet::from_paths(case, self.files.iter().cloned())
    }

    /// Folders as a [`PathSet`] under the given case mode
    pub fn folder_set(&self, case: PathCase) -> PathSet {
        PathSet::from_paths(case, self.folders.iter().cloned())
    }
}

/// Run-scoped tallies kept while a sync applies a diff
///
/// Success counters record items actually processed (or, in a dry run,
/// items that would have been processed). Each failure counter maps to one
/// line of the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncCounters {
    /// Left-only files copied to the destination
    pub files_copied: u64,
    /// Changed files overwritten in the destination
    pub files_updated: u64,
    /// Changed files removed from the destination
    pub changed_files_deleted: u64,
    /// Identical files removed from the destination
    pub identical_files_deleted: u64,
    /// Right-only files removed from the destination
    pub right_only_files_deleted: u64,
    /// Left-only folders created in the destination
    pub folders_created: u64,
    /// Right-only folders removed from the destination
    pub folders_deleted: u64,
    /// Copies (new or changed) that failed
    pub files_failed_to_copy: u64,
    /// File deletions that failed
    pub files_failed_to_delete: u64,
    /// Folder creations that failed
    pub folders_failed_to_create: u64,
    /// Folder deletions that failed
    pub folders_failed_to_delete: u64,
    /// File pairs that could not be compared
    pub comparisons_failed: u64,
}

impl SyncCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Files removed from the destination across all delete phases
    pub fn files_deleted(&self) -> u64 {
        self.changed_files_deleted + self.identical_files_deleted + self.right_only_files_deleted
    }

    /// Successful (or hypothetical) mutations of any kind
    pub fn total_changes(&self) -> u64 {
        self.files_copied
            + self.files_updated
            + self.files_deleted()
            + self.folders_created
            + self.folders_deleted
    }

    /// Sum of every failure counter
    pub fn total_failures(&self) -> u64 {
        self.files_failed_to_copy
            + self.files_failed_to_delete
            + self.folders_failed_to_create
            + self.folders_failed_to_delete
            + self.comparisons_failed
    }

    /// Whether any failure counter is nonzero
    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }

    /// Merge another set of counters into this one
    pub fn merge(&mut self, other: &Self) {
        self.files_copied += other.files_copied;
        self.files_updated += other.files_updated;
        self.changed_files_deleted += other.changed_files_deleted;
        self.identical_files_deleted += other.identical_files_deleted;
        self.right_only_files_deleted += other.right_only_files_deleted;
        self.folders_created += other.folders_created;
        self.folders_deleted += other.folders_deleted;
        self.files_failed_to_copy += other.files_failed_to_copy;
        self.files_failed_to_delete += other.files_failed_to_delete;
        self.folders_failed_to_create += other.folders_failed_to_create;
        self.folders_failed_to_delete += other.folders_failed_to_delete;
        self.comparisons_failed += other.comparisons_failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_sets_follow_case() {
        let listing = TreeListing::with_entries(
            vec![RelativePath::new("A.txt"), RelativePath::new("a.txt")],
            vec![RelativePath::new("dir")],
        );
        assert_eq!(listing.file_set(PathCase::Insensitive).len(), 1);
        assert_eq!(listing.file_set(PathCase::Sensitive).len(), 2);
        assert!(listing.folder_set(PathCase::Insensitive).contains(&"DIR".into()));
        assert!(!listing.is_empty());
        assert!(TreeListing::new().is_empty());
    }

    #[test]
    fn test_counters_totals() {
        let mut counters = SyncCounters::new();
        assert!(!counters.has_failures());
        assert_eq!(counters.total_changes(), 0);

        counters.files_copied = 2;
        counters.right_only_files_deleted = 1;
        counters.folders_created = 1;
        assert_eq!(counters.total_changes(), 4);

        counters.comparisons_failed = 1;
        assert!(counters.has_failures());

        let mut other = SyncCounters::new();
        other.files_failed_to_delete = 3;
        counters.merge(&other);
        assert_eq!(counters.total_failures(), 4);
    }
}
