//! Sync policy: which diff categories a run acts on

use serde::{Deserialize, Serialize};

/// Independent switches selecting what a sync does with each diff category
///
/// The default is a mirror: new and changed files are copied, right-only
/// files and folders are removed and empty folders are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Copy files that exist only in the source
    pub copy_left_only: bool,
    /// Overwrite changed files in the destination
    pub update_changed: bool,
    /// Delete changed files from the destination, ignored when
    /// `update_changed` is set
    pub delete_changed: bool,
    /// Delete files that are identical on both sides from the destination
    pub delete_identical: bool,
    /// Delete files that exist only in the destination
    pub delete_right_only_files: bool,
    /// Create folders that exist only in the source
    pub create_empty_folders: bool,
    /// Recursively delete folders that exist only in the destination
    pub delete_right_only_folders: bool,
    /// Log intended actions without touching disk
    pub dry_run: bool,
    /// Glob matched against file names
    pub pattern: String,
    /// Walk the full subtree instead of the top level only
    pub recursive: bool,
    /// Let modification times decide between identical and changed
    pub respect_date: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::mirror()
    }
}

impl SyncPolicy {
    /// Match-all glob
    pub const MATCH_ALL: &'static str = "*";

    /// Make the destination an exact copy of the source
    pub fn mirror() -> Self {
        Self {
            copy_left_only: true,
            update_changed: true,
            delete_changed: false,
            delete_identical: false,
            delete_right_only_files: true,
            create_empty_folders: true,
            delete_right_only_folders: true,
            dry_run: false,
            pattern: Self::MATCH_ALL.to_string(),
            recursive: true,
            respect_date: true,
        }
    }

    /// Copy new and changed files, never delete anything
    pub fn copy_only() -> Self {
        Self {
            delete_right_only_files: false,
            delete_right_only_folders: false,
            ..Self::mirror()
        }
    }

    /// A policy with every category switched off
    pub fn none() -> Self {
        Self {
            copy_left_only: false,
            update_changed: false,
            delete_changed: false,
            delete_identical: false,
            delete_right_only_files: false,
            create_empty_folders: false,
            delete_right_only_folders: false,
            ..Self::mirror()
        }
    }

    /// Whether file contents need to be read during the diff
    pub fn compare_contents(&self) -> bool {
        self.update_changed || self.delete_changed || self.delete_identical
    }

    /// Whether changed files are deleted, honouring update precedence
    pub fn deletes_changed(&self) -> bool {
        self.delete_changed && !self.update_changed
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
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

    /// Let modification times decide the tie-break
    pub fn with_respect_date(mut self, respect_date: bool) -> Self {
        self.respect_date = respect_date;
        self
    }

    /// Toggle copying of left-only files
    pub fn with_copy_left_only(mut self, enabled: bool) -> Self {
        self.copy_left_only = enabled;
        self
    }

    /// Toggle overwriting of changed files
    pub fn with_update_changed(mut self, enabled: bool) -> Self {
        self.update_changed = enabled;
        self
    }

    /// Toggle deletion of changed files
    pub fn with_delete_changed(mut self, enabled: bool) -> Self {
        self.delete_changed = enabled;
        self
    }

    /// Toggle deletion of identical files
    pub fn with_delete_identical(mut self, enabled: bool) -> Self {
        self.delete_identical = enabled;
        self
    }

    /// Toggle deletion of right-only files
    pub fn with_delete_right_only_files(mut self, enabled: bool) -> Self {
        self.delete_right_only_files = enabled;
        self
    }

    /// Toggle creation of left-only folders
    pub fn with_create_empty_folders(mut self, enabled: bool) -> Self {
        self.create_empty_folders = enabled;
        self
    }

    /// Toggle deletion of right-only folders
    pub fn with_delete_right_only_folders(mut self, enabled: bool) -> Self {
        self.delete_right_only_folders = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_mirror() {
        let policy = SyncPolicy::default();
        assert!(policy.copy_left_only);
        assert!(policy.update_changed);
        assert!(policy.delete_right_only_files);
        assert!(policy.delete_right_only_folders);
        assert!(!policy.delete_identical);
        assert!(!policy.dry_run);
        assert_eq!(policy.pattern, "*");
        assert!(policy.recursive && policy.respect_date);
    }

    #[rstest]
    #[case(SyncPolicy::none(), false)]
    #[case(SyncPolicy::none().with_copy_left_only(true), false)]
    #[case(SyncPolicy::none().with_update_changed(true), true)]
    #[case(SyncPolicy::none().with_delete_changed(true), true)]
    #[case(SyncPolicy::none().with_delete_identical(true), true)]
    fn test_compare_contents(#[case] policy: SyncPolicy, #[case] expected: bool) {
        assert_eq!(policy.compare_contents(), expected);
    }

    #[test]
    fn test_update_takes_precedence_over_delete_changed() {
        let policy = SyncPolicy::none()
            .with_update_changed(true)
            .with_delete_changed(true);
        assert!(!policy.deletes_changed());
        assert!(SyncPolicy::none().with_delete_changed(true).deletes_changed());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: SyncPolicy = serde_yaml::from_str("dry_run: true\npattern: \"*.txt\"\n").unwrap();
        assert!(policy.dry_run);
        assert_eq!(policy.pattern, "*.txt");
        assert!(policy.copy_left_only);
    }
}
