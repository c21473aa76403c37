//! Core type system and error handling for ContentSync
//!
//! This crate provides the foundational types shared by every other
//! ContentSync crate:
//!
//! - **Paths**: [`RelativePath`] and the case-aware [`PathSet`]
//! - **Listings**: [`TreeListing`] snapshots produced by a scan
//! - **Counters**: [`SyncCounters`] accumulated while a sync runs
//! - **Errors**: a single [`Error`] type with kind and severity
//! - **Tuning**: validated [`WorkerCount`] and [`ChunkSize`] values
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use contentsync_types::{PathCase, PathSet, RelativePath};
//!
//! let mut set = PathSet::new(PathCase::Insensitive);
//! set.insert(RelativePath::new("Docs\\Readme.md"));
//! assert!(set.contains(&RelativePath::new("docs/README.md")));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod path;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{ChunkSize, WorkerCount};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use path::{PathCase, PathSet, RelativePath};
pub use result::Result;
pub use types::*;
