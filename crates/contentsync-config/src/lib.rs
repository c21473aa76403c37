//! Configuration management system for ContentSync
//!
//! Configuration is layered: built-in defaults, then an optional YAML, TOML
//! or JSON file, then `CONTENTSYNC__*` environment variables. Command-line
//! flags are applied on top by the binary.
//!
//! # Examples
//!
//! ```rust
//! use contentsync_config::{Config, ConfigBuilder};
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("contentsync.yaml")
//!     .add_env_prefix("CONTENTSYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Pattern: {}", config.policy.pattern);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

use contentsync_types::{ChunkSize, PathCase, WorkerCount};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;
pub mod policy;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use policy::SyncPolicy;

/// Main configuration structure for ContentSync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What a sync run does with each diff category
    pub policy: SyncPolicy,
    /// Directory scanning behaviour
    pub scan: ScanConfig,
    /// Concurrency and I/O tuning
    pub performance: PerformanceConfig,
    /// Listing cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Directory scanning configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Compare relative paths byte for byte instead of ignoring case
    pub case_sensitive: bool,
    /// Descend into symbolic links to directories
    pub follow_symlinks: bool,
}

impl ScanConfig {
    /// Path comparison mode selected by this configuration
    pub fn path_case(&self) -> PathCase {
        PathCase::from_sensitive(self.case_sensitive)
    }
}

/// Performance-related configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Upper bound on concurrent content comparisons
    pub max_workers: WorkerCount,
    /// Size of each lockstep comparison read
    pub compare_chunk_size: ChunkSize,
    /// Copy the source's modification time onto copied files
    pub preserve_timestamps: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: WorkerCount::default(),
            compare_chunk_size: ChunkSize::default(),
            preserve_timestamps: true,
        }
    }
}

/// Listing cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consult and populate the on-disk listing cache
    pub enabled: bool,
    /// Cache directory, defaults to the user cache directory
    pub directory: Option<PathBuf>,
    /// Entries older than this many seconds are treated as misses
    pub max_age_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            max_age_secs: None,
        }
    }
}

impl CacheConfig {
    /// Directory the cache lives in, resolving the platform default
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            loader::default_cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("contentsync")
                .join("listings")
        })
    }

    /// Maximum entry age, if one is configured
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            colored_output: true,
        }
    }
}
