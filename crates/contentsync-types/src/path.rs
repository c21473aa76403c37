//! Relative path representation shared by both sides of a sync
//!
//! A [`RelativePath`] is stored with `/` as its only separator and never
//! carries the root it was discovered under, so the same value can be
//! resolved against the source and the destination. Equality between the
//! two sides is decided by [`PathCase`], which is case-insensitive unless
//! configured otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Canonical separator used inside a [`RelativePath`]
pub const SEPARATOR: char = '/';

/// How two relative paths are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PathCase {
    /// `A.txt` and `a.txt` name the same entry
    #[default]
    Insensitive,
    /// Paths must match byte for byte
    Sensitive,
}

impl PathCase {
    /// Select a comparison mode from a `case_sensitive` switch
    pub fn from_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }

    /// Whether letters of differing case are treated as equal
    pub fn is_insensitive(self) -> bool {
        matches!(self, Self::Insensitive)
    }

    /// Fold a string into its comparison key
    pub fn fold(self, value: &str) -> String {
        match self {
            Self::Insensitive => value.to_lowercase(),
            Self::Sensitive => value.to_owned(),
        }
    }
}

/// A path relative to a scan root, using `/` as separator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a relative path, normalizing separators
    ///
    /// Backslashes become `/`, repeated separators collapse and leading or
    /// trailing separators are dropped.
    pub fn new(value: impl AsRef<str>) -> Self {
        let normalized = value
            .as_ref()
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Build a relative path from an entry discovered under `root`
    ///
    /// Returns `None` when `path` is not below `root` or when a component is
    /// not valid UTF-8.
    pub fn strip_root(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        Self::from_relative(relative)
    }

    /// Build a relative path from an already-relative filesystem path
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(Self(segments.join("/")))
    }

    /// The path as a `/`-separated string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root itself
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final segment of the path
    pub fn file_name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or_default()
    }

    /// Parent path, `None` for a top-level entry
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rfind(SEPARATOR)
            .map(|index| Self(self.0[..index].to_owned()))
    }

    /// Whether `self` is `other` or lies beneath it
    pub fn starts_with(&self, other: &Self, case: PathCase) -> bool {
        if other.is_empty() {
            return true;
        }
        let this = case.fold(&self.0);
        let prefix = case.fold(&other.0);
        this == prefix
            || (this.starts_with(&prefix) && this[prefix.len()..].starts_with(SEPARATOR))
    }

    /// Resolve this path against a root directory
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        for segment in self.0.split(SEPARATOR).filter(|s| !s.is_empty()) {
            resolved.push(segment);
        }
        resolved
    }

    /// Comparison key under the given case mode
    pub fn key(&self, case: PathCase) -> String {
        case.fold(&self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelativePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RelativePath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A deduplicated, ordered set of relative paths
///
/// Membership follows the set's [`PathCase`]. The first spelling inserted
/// for a key is the one kept. Iteration is ascending by comparison key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    case: PathCase,
    entries: BTreeMap<String, RelativePath>,
}

impl PathSet {
    /// Create an empty set
    pub fn new(case: PathCase) -> Self {
        Self {
            case,
            entries: BTreeMap::new(),
        }
    }

    /// Create a set from any sequence of paths
    pub fn from_paths<I>(case: PathCase, paths: I) -> Self
    where
        I: IntoIterator<Item = RelativePath>,
    {
        let mut set = Self::new(case);
        set.extend(paths);
        set
    }

    /// Comparison mode of this set
    pub fn case(&self) -> PathCase {
        self.case
    }

    /// Insert a path, returning `false` if an equal path was already present
    pub fn insert(&mut self, path: RelativePath) -> bool {
        let key = path.key(self.case);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, path);
        true
    }

    /// Whether an equal path is present
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.entries.contains_key(&path.key(self.case))
    }

    /// The stored spelling of an equal path
    pub fn get(&self, path: &RelativePath) -> Option<&RelativePath> {
        self.entries.get(&path.key(self.case))
    }

    /// Remove an equal path, returning the stored spelling
    pub fn remove(&mut self, path: &RelativePath) -> Option<RelativePath> {
        self.entries.remove(&path.key(self.case))
    }

    /// Number of paths in the set
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = &RelativePath> {
        self.entries.values()
    }

    /// Paths of `self` that are not in `other`, in ascending order
    pub fn difference(&self, other: &Self) -> Vec<RelativePath> {
        self.iter()
            .filter(|path| !other.contains(path))
            .cloned()
            .collect()
    }

    /// Consume the set into an ascending vector
    pub fn into_sorted_vec(self) -> Vec<RelativePath> {
        self.entries.into_values().collect()
    }
}

impl Extend<RelativePath> for PathSet {
    fn extend<T: IntoIterator<Item = RelativePath>>(&mut self, iter: T) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl IntoIterator for PathSet {
    type Item = RelativePath;
    type IntoIter = std::collections::btree_map::IntoValues<String, RelativePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
