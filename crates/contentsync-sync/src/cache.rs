//! Listing cache keyed by normalized root and pattern
//!
//! A recursive scan stores its [`TreeListing`] here so the next run over the
//! same `(root, pattern)` can skip the walk. Roots are kept with their
//! on-disk spelling so that directories differing only in case never share
//! an entry, and listings walked through symbolic links are stored apart
//! from those that were not. The cache is never
//! authoritative: a sync marks its destination as written, and once the run
//! finishes without failures every entry for that root is dropped.

use contentsync_types::{Error, Result, TreeListing};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const ENTRY_EXTENSION: &str = "listing";
const FORMAT_VERSION: u32 = 2;

/// Identity of a cached listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    root: String,
    pattern: String,
    follow_symlinks: bool,
}

impl CacheKey {
    /// Build a key for `root` scanned with `pattern`
    pub fn new(root: &Path, pattern: &str) -> Self {
        Self {
            root: normalize_root(root),
            pattern: pattern.to_owned(),
            follow_symlinks: false,
        }
    }

    /// Key for a walk that descends into symbolic links
    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Normalized root
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Scan pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the listing was walked through symbolic links
    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Stable short digest used as the on-disk file name
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.root.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.pattern.as_bytes());
        hasher.update(&[u8::from(self.follow_symlinks)]);
        hasher.finalize().to_hex()[..16].to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.follow_symlinks {
            write!(f, "{} [{}, following links]", self.root, self.pattern)
        } else {
            write!(f, "{} [{}]", self.root, self.pattern)
        }
    }
}

/// Absolute, `/`-separated form of `root` without a trailing separator
///
/// The spelling is never case-folded, so directories that differ only in
/// case keep distinct keys on a case-sensitive filesystem.
pub fn normalize_root(root: &Path) -> String {
    let absolute = std::fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf());
    let text = absolute.to_string_lossy().replace('\\', "/");
    let text = text.strip_prefix("//?/").unwrap_or(&text);
    let trimmed = text.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Persisted mapping from `(root, pattern)` to a listing snapshot
///
/// Implementations must never return a listing stored under a different
/// key, and must serialize concurrent writers.
pub trait ListingCache: Send + Sync + fmt::Debug {
    /// Look up a listing
    fn try_read(&self, key: &CacheKey) -> Result<Option<TreeListing>>;

    /// Store a listing, replacing any previous one for the key
    fn write(&self, key: &CacheKey, listing: &TreeListing) -> Result<()>;

    /// Record that the run is about to write beneath `normalized_root`
    fn mark_written(&self, normalized_root: String);

    /// Drop every entry whose root was marked written, returning the count
    fn clear_written_entries(&self) -> Result<usize>;

    /// Drop every entry, returning the count
    fn clear(&self) -> Result<usize>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredListing {
    version: u32,
    root: String,
    pattern: String,
    follow_symlinks: bool,
    cached_at: SystemTime,
    listing: TreeListing,
}

/// Listing cache stored as one file per key
#[derive(Debug)]
pub struct DiskListingCache {
    directory: PathBuf,
    max_age: Option<Duration>,
    lock: RwLock<()>,
    written_roots: Mutex<HashSet<String>>,
}

impl DiskListingCache {
    /// Open (creating if needed) a cache directory
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory).map_err(|e| {
            Error::cache(format!(
                "Failed to create cache directory '{}': {}",
                directory.display(),
                e
            ))
        })?;

        Ok(Self {
            directory,
            max_age: None,
            lock: RwLock::new(()),
            written_roots: Mutex::new(HashSet::new()),
        })
    }

    /// Treat entries older than `max_age` as misses
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Cache directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.directory
            .join(format!("{}.{}", key.digest(), ENTRY_EXTENSION))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.directory).map_err(|e| {
            Error::cache(format!(
                "Failed to read cache directory '{}': {}",
                self.directory.display(),
                e
            ))
        })?;

        Ok(entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION))
            .collect())
    }

    fn decode(path: &Path) -> Option<StoredListing> {
        let data = std::fs::read(path).ok()?;
        match bincode::serde::decode_from_slice::<StoredListing, _>(
            &data,
            bincode::config::standard(),
        ) {
            Ok((stored, _)) if stored.version == FORMAT_VERSION => Some(stored),
            Ok(_) => {
                debug!("Ignoring cache entry with old format: {}", path.display());
                None
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                let _ = std::fs::remove_file(path);
                None
            }
        }
    }

    fn is_expired(&self, stored: &StoredListing) -> bool {
        self.max_age.is_some_and(|max_age| {
            SystemTime::now()
                .duration_since(stored.cached_at)
                .map(|age| age > max_age)
                .unwrap_or(false)
        })
    }
}

impl ListingCache for DiskListingCache {
    fn try_read(&self, key: &CacheKey) -> Result<Option<TreeListing>> {
        let _guard = self.lock.read().map_err(|_| Error::cache("cache lock poisoned"))?;
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let Some(stored) = Self::decode(&path) else {
            return Ok(None);
        };
        if stored.root != key.root
            || stored.pattern != key.pattern
            || stored.follow_symlinks != key.follow_symlinks
        {
            debug!("Cache entry {} belongs to another key", path.display());
            return Ok(None);
        }
        if self.is_expired(&stored) {
            debug!("Cache entry for {} has expired", key);
            return Ok(None);
        }

        Ok(Some(stored.listing))
    }

    fn write(&self, key: &CacheKey, listing: &TreeListing) -> Result<()> {
        let stored = StoredListing {
            version: FORMAT_VERSION,
            root: key.root.clone(),
            pattern: key.pattern.clone(),
            follow_symlinks: key.follow_symlinks,
            cached_at: SystemTime::now(),
            listing: listing.clone(),
        };
        let data = bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| Error::cache(format!("Failed to serialize listing: {}", e)))?;

        let _guard = self.lock.write().map_err(|_| Error::cache("cache lock poisoned"))?;
        let path = self.entry_path(key);
        let temp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        std::fs::write(&temp_path, data)
            .and_then(|()| std::fs::rename(&temp_path, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&temp_path);
                Error::cache(format!(
                    "Failed to write cache entry '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        debug!("Cached listing for {} at {}", key, path.display());
        Ok(())
    }

    fn mark_written(&self, normalized_root: String) {
        if let Ok(mut roots) = self.written_roots.lock() {
            roots.insert(normalized_root);
        }
    }

    fn clear_written_entries(&self) -> Result<usize> {
        let roots: HashSet<String> = match self.written_roots.lock() {
            Ok(mut roots) => std::mem::take(&mut *roots),
            Err(_) => return Err(Error::cache("written-roots lock poisoned")),
        };
        if roots.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.write().map_err(|_| Error::cache("cache lock poisoned"))?;
        let mut removed = 0;
        for path in self.entry_files()? {
            let Some(stored) = Self::decode(&path) else {
                continue;
            };
            if roots.contains(&stored.root) && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        debug!("Dropped {} cached listings for written roots", removed);
        Ok(removed)
    }

    fn clear(&self) -> Result<usize> {
        let _guard = self.lock.write().map_err(|_| Error::cache("cache lock poisoned"))?;
        let mut removed = 0;
        for path in self.entry_files()? {
            if std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        info!("Cleared {} cached listings", removed);
        Ok(removed)
    }
}

/// In-process listing cache
#[derive(Debug, Default)]
pub struct MemoryListingCache {
    entries: RwLock<HashMap<CacheKey, TreeListing>>,
    written_roots: Mutex<HashSet<String>>,
}

impl MemoryListingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored listings
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether no listings are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ListingCache for MemoryListingCache {
    fn try_read(&self, key: &CacheKey) -> Result<Option<TreeListing>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::cache("cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &CacheKey, listing: &TreeListing) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::cache("cache lock poisoned"))?;
        entries.insert(key.clone(), listing.clone());
        Ok(())
    }

    fn mark_written(&self, normalized_root: String) {
        if let Ok(mut roots) = self.written_roots.lock() {
            roots.insert(normalized_root);
        }
    }

    fn clear_written_entries(&self) -> Result<usize> {
        let roots: HashSet<String> = match self.written_roots.lock() {
            Ok(mut roots) => std::mem::take(&mut *roots),
            Err(_) => return Err(Error::cache("written-roots lock poisoned")),
        };

        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::cache("cache lock poisoned"))?;
        let before = entries.len();
        entries.retain(|key, _| !roots.contains(&key.root));
        Ok(before - entries.len())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::cache("cache lock poisoned"))?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
