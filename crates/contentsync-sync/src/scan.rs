//! Directory scanning into relative-path listings

use crate::cache::{CacheKey, ListingCache};
use contentsync_types::{Error, PathCase, RelativePath, Result, TreeListing};
use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks a root and lists the files matching a pattern
///
/// Recursive scans go through the listing cache when one is attached; a
/// top-level scan is always live and never cached.
#[derive(Debug, Clone, Default)]
pub struct TreeScanner {
    cache: Option<Arc<dyn ListingCache>>,
    case: PathCase,
    follow_symlinks: bool,
}

impl TreeScanner {
    /// Create a scanner with no cache and case-insensitive paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listing cache
    pub fn with_cache(mut self, cache: Arc<dyn ListingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the path comparison mode
    pub fn with_case(mut self, case: PathCase) -> Self {
        self.case = case;
        self
    }

    /// Descend into symbolic links to directories
    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Path comparison mode
    pub fn case(&self) -> PathCase {
        self.case
    }

    /// Attached listing cache
    pub fn cache(&self) -> Option<&Arc<dyn ListingCache>> {
        self.cache.as_ref()
    }

    /// Compile a file name pattern under this scanner's case mode
    pub fn compile_pattern(&self, pattern: &str) -> Result<GlobMatcher> {
        GlobBuilder::new(pattern)
            .case_insensitive(self.case.is_insensitive())
            .literal_separator(true)
            .build()
            .map(|glob| glob.compile_matcher())
            .map_err(|e| Error::config(format!("Invalid pattern '{}': {}", pattern, e)))
    }

    /// List `root`, recursively or top-level only
    ///
    /// The root must exist. Enumeration errors fail the whole scan; there
    /// is no partial listing. A cancelled recursive walk returns
    /// [`Error::Cancelled`] and caches nothing.
    pub fn scan(
        &self,
        root: &Path,
        pattern: &str,
        recursive: bool,
        cancel: &CancellationToken,
    ) -> Result<TreeListing> {
        let matcher = self.compile_pattern(pattern)?;
        if !recursive {
            return self.scan_top_level(root, &matcher);
        }

        let key = CacheKey::new(root, pattern).with_follow_symlinks(self.follow_symlinks);
        if let Some(cache) = &self.cache {
            match cache.try_read(&key) {
                Ok(Some(listing)) => {
                    debug!(
                        "Listing cache hit for {}: {} files, {} folders",
                        root.display(),
                        listing.files.len(),
                        listing.folders.len()
                    );
                    return Ok(listing);
                }
                Ok(None) => debug!("Listing cache miss for {}", root.display()),
                Err(e) => warn!("Listing cache unavailable for {}: {}", root.display(), e),
            }
        }

        let listing = self.walk(root, &matcher, cancel)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(&key, &listing) {
                warn!("Unable to cache listing for {}: {}", root.display(), e);
            }
        }

        Ok(listing)
    }

    fn scan_top_level(&self, root: &Path, matcher: &GlobMatcher) -> Result<TreeListing> {
        let mut listing = TreeListing::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| Error::scan(root, e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(relative) = relative_to(root, entry.path()) {
                if matcher.is_match(relative.file_name()) {
                    listing.files.push(relative);
                }
            }
        }

        debug!(
            "Scanned top level of {}: {} files",
            root.display(),
            listing.files.len()
        );
        Ok(listing)
    }

    fn walk(
        &self,
        root: &Path,
        matcher: &GlobMatcher,
        cancel: &CancellationToken,
    ) -> Result<TreeListing> {
        let mut listing = TreeListing::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let entry = entry.map_err(|e| Error::scan(root, e.to_string()))?;
            let Some(relative) = relative_to(root, entry.path()) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                listing.folders.push(relative);
            } else if file_type.is_file() && matcher.is_match(relative.file_name()) {
                listing.files.push(relative);
            }
        }

        debug!(
            "Scanned {}: {} files, {} folders",
            root.display(),
            listing.files.len(),
            listing.folders.len()
        );
        Ok(listing)
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<RelativePath> {
    let relative = RelativePath::strip_root(root, path);
    if relative.is_none() {
        warn!("Skipping entry with a non UTF-8 name: {}", path.display());
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryListingCache;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("image.png"), "png").unwrap();
        fs::write(root.join("docs/readme.txt"), "readme").unwrap();
        fs::write(root.join("docs/nested/deep.TXT"), "deep").unwrap();
        dir
    }

    fn names(paths: &[RelativePath]) -> Vec<&str> {
        paths.iter().map(RelativePath::as_str).collect()
    }

    #[test]
    fn test_recursive_scan_lists_files_and_folders() {
        let dir = tree();
        let listing = TreeScanner::new()
            .scan(dir.path(), "*", true, &CancellationToken::new())
            .unwrap();

        assert_eq!(
            names(&listing.files),
            vec!["docs/nested/deep.TXT", "docs/readme.txt", "image.png", "top.txt"]
        );
        assert_eq!(names(&listing.folders), vec!["docs", "docs/nested", "empty"]);
    }

    #[test]
    fn test_pattern_matches_file_names_case_insensitively() {
        let dir = tree();
        let listing = TreeScanner::new()
            .scan(dir.path(), "*.txt", true, &CancellationToken::new())
            .unwrap();
        assert_eq!(
            names(&listing.files),
            vec!["docs/nested/deep.TXT", "docs/readme.txt", "top.txt"]
        );
        assert_eq!(listing.folders.len(), 3);

        let sensitive = TreeScanner::new()
            .with_case(PathCase::Sensitive)
            .scan(dir.path(), "*.txt", true, &CancellationToken::new())
            .unwrap();
        assert_eq!(names(&sensitive.files), vec!["docs/readme.txt", "top.txt"]);
    }

    #[test]
    fn test_top_level_scan_has_no_folders() {
        let dir = tree();
        let listing = TreeScanner::new()
            .scan(dir.path(), "*", false, &CancellationToken::new())
            .unwrap();
        assert_eq!(names(&listing.files), vec!["image.png", "top.txt"]);
        assert!(listing.folders.is_empty());
    }

    #[test]
    fn test_recursive_scan_uses_cache() {
        let dir = tree();
        let cache = Arc::new(MemoryListingCache::new());
        let scanner = TreeScanner::new().with_cache(cache.clone());
        let cancel = CancellationToken::new();

        let first = scanner.scan(dir.path(), "*", true, &cancel).unwrap();
        assert_eq!(cache.len(), 1);

        fs::write(dir.path().join("late.txt"), "late").unwrap();
        let second = scanner.scan(dir.path(), "*", true, &cancel).unwrap();
        assert_eq!(first, second);

        scanner.scan(dir.path(), "*", false, &cancel).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_roots_differing_only_in_case_keep_separate_listings() {
        let dir = TempDir::new().unwrap();
        let upper = dir.path().join("Photos");
        let lower = dir.path().join("photos");
        fs::create_dir_all(&upper).unwrap();
        fs::create_dir_all(&lower).unwrap();
        fs::write(upper.join("only-in-upper.jpg"), "upper").unwrap();
        fs::write(lower.join("only-in-lower.jpg"), "lower").unwrap();
        if fs::canonicalize(&upper).unwrap() == fs::canonicalize(&lower).unwrap() {
            // Case-insensitive filesystem: both names are one directory.
            return;
        }

        let cache = Arc::new(MemoryListingCache::new());
        let scanner = TreeScanner::new().with_cache(cache.clone());
        let cancel = CancellationToken::new();

        let upper_listing = scanner.scan(&upper, "*", true, &cancel).unwrap();
        let lower_listing = scanner.scan(&lower, "*", true, &cancel).unwrap();
        assert_eq!(names(&upper_listing.files), vec!["only-in-upper.jpg"]);
        assert_eq!(names(&lower_listing.files), vec!["only-in-lower.jpg"]);
        assert_eq!(cache.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_mode_is_part_of_cache_key() {
        let dir = tree();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("linked.txt"), "linked").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let cache = Arc::new(MemoryListingCache::new());
        let cancel = CancellationToken::new();
        let following = TreeScanner::new()
            .with_cache(cache.clone())
            .with_follow_symlinks(true)
            .scan(dir.path(), "*", true, &cancel)
            .unwrap();
        assert!(names(&following.files).contains(&"link/linked.txt"));

        let plain = TreeScanner::new()
            .with_cache(cache.clone())
            .scan(dir.path(), "*", true, &cancel)
            .unwrap();
        assert!(!names(&plain.files).contains(&"link/linked.txt"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cancelled_scan_is_not_cached() {
        let dir = tree();
        let cache = Arc::new(MemoryListingCache::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = TreeScanner::new()
            .with_cache(cache.clone())
            .scan(dir.path(), "*", true, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_root_is_scan_error() {
        let dir = TempDir::new().unwrap();
        let error = TreeScanner::new()
            .scan(&dir.path().join("absent"), "*", true, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(error, Error::Scan { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tree();
        let error = TreeScanner::new()
            .scan(dir.path(), "[", true, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(error, Error::Config { .. }));
    }
}
