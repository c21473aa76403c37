//! Diff and one-way synchronization engine for ContentSync
//!
//! This crate holds the core of ContentSync:
//!
//! - **Scanning**: [`TreeScanner`] lists a root, going through a
//!   [`ListingCache`] for recursive scans
//! - **Comparison**: [`ContentComparator`] checks two files byte for byte
//! - **Diffing**: [`DiffEngine`] sorts every path into a [`FolderDiffResult`]
//!   category, comparing pairs under a bounded worker budget
//! - **Synchronization**: [`SyncEngine`] applies a policy to a diff through
//!   [`FileOps`] and reports what happened in a [`SyncReport`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use contentsync_config::SyncPolicy;
//! use contentsync_sync::SyncEngine;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SyncEngine::default();
//! let report = engine
//!     .sync(
//!         Path::new("source"),
//!         Path::new("backup"),
//!         &SyncPolicy::mirror(),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! for line in report.summary_lines() {
//!     println!("{}", line.text);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod compare;
pub mod diff;
pub mod engine;
pub mod fileops;
pub mod progress;
pub mod report;
pub mod scan;

mod os;

pub use cache::{normalize_root, CacheKey, DiskListingCache, ListingCache, MemoryListingCache};
pub use compare::ContentComparator;
pub use diff::{DiffEngine, DiffOptions, FolderDiffResult};
pub use engine::{EngineOptions, SyncEngine};
pub use fileops::FileOps;
pub use progress::{PhaseTimer, PhaseTiming, SyncPhase, TimedSection};
pub use report::{pluralize, SummaryLine, SyncReport, Tone};
pub use scan::TreeScanner;
