//! Unified test utilities for ContentSync tests and benchmarks
//!
//! Helpers to lay out source/destination trees with pinned modification
//! times and to snapshot a tree so a test can prove it was left untouched.

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary source and destination pair
///
/// Both roots live in one temporary directory that is removed on drop. The
/// source root is created; the destination is not.
#[derive(Debug)]
pub struct SyncFixture {
    _temp: TempDir,
    /// Source root
    pub source: PathBuf,
    /// Destination root
    pub destination: PathBuf,
}

impl SyncFixture {
    /// Create a fixture with an empty source and no destination
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source = temp.path().join("source");
        let destination = temp.path().join("destination");
        fs::create_dir_all(&source).expect("Failed to create source root");
        Self {
            _temp: temp,
            source,
            destination,
        }
    }

    /// Builder for the source tree
    pub fn source(&self) -> TreeBuilder {
        TreeBuilder::new(&self.source)
    }

    /// Builder for the destination tree, creating its root
    pub fn destination(&self) -> TreeBuilder {
        fs::create_dir_all(&self.destination).expect("Failed to create destination root");
        TreeBuilder::new(&self.destination)
    }
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes files and folders under a root
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: PathBuf,
}

impl TreeBuilder {
    /// Builder rooted at `root`
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Write a file, creating parent folders, with a fixed modification time
    pub fn file(&self, relative: &str, contents: impl AsRef<[u8]>, mtime_secs: i64) -> &Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent folder");
        }
        fs::write(&path, contents).expect("Failed to write test file");
        set_mtime(&path, mtime_secs);
        self
    }

    /// Create a folder and its parents
    pub fn folder(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.root.join(relative)).expect("Failed to create folder");
        self
    }

    /// Remove a file
    pub fn remove(&self, relative: &str) -> &Self {
        fs::remove_file(self.root.join(relative)).expect("Failed to remove file");
        self
    }
}

/// Pin a file's modification time to `secs` after the Unix epoch
pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0))
        .expect("Failed to set modification time");
}

/// Modification time of a file in seconds after the Unix epoch
pub fn mtime(path: &Path) -> i64 {
    let metadata = fs::metadata(path).expect("Failed to stat file");
    FileTime::from_last_modification_time(&metadata).unix_seconds()
}

/// One entry of a [`snapshot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A folder
    Folder,
    /// A file with its bytes and modification time
    File {
        /// File contents
        contents: Vec<u8>,
        /// Modification time in seconds
        mtime: i64,
    },
}

/// Every entry beneath `root` keyed by its `/`-separated relative path
///
/// A missing root yields an empty snapshot.
pub fn snapshot(root: &Path) -> BTreeMap<String, Entry> {
    let mut entries = BTreeMap::new();
    if root.exists() {
        collect(root, root, &mut entries);
    }
    entries
}

fn collect(root: &Path, dir: &Path, entries: &mut BTreeMap<String, Entry>) {
    for entry in fs::read_dir(dir).expect("Failed to read folder") {
        let path = entry.expect("Failed to read entry").path();
        let relative = path
            .strip_prefix(root)
            .expect("Entry outside root")
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_dir() {
            entries.insert(relative, Entry::Folder);
            collect(root, &path, entries);
        } else {
            entries.insert(
                relative,
                Entry::File {
                    contents: fs::read(&path).expect("Failed to read file"),
                    mtime: mtime(&path),
                },
            );
        }
    }
}

/// Deterministic file contents of `size` bytes
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_sees_files_and_folders() {
        let fixture = SyncFixture::new();
        fixture
            .source()
            .file("a/b.txt", "bee", 1_000)
            .folder("empty");

        let snap = snapshot(&fixture.source);
        assert_eq!(snap.get("a"), Some(&Entry::Folder));
        assert_eq!(snap.get("empty"), Some(&Entry::Folder));
        assert_eq!(
            snap.get("a/b.txt"),
            Some(&Entry::File {
                contents: b"bee".to_vec(),
                mtime: 1_000
            })
        );
        assert!(snapshot(&fixture.destination).is_empty());
    }

    #[test]
    fn test_generate_test_data_is_deterministic() {
        assert_eq!(generate_test_data(64), generate_test_data(64));
        assert_eq!(generate_test_data(10).len(), 10);
    }
}
