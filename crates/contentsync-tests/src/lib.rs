//! ContentSync Testing Suite
//!
//! This crate holds the end-to-end tests and benchmarks for ContentSync and
//! the fixtures they share.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Tree builders, snapshots and modification-time helpers used by the
/// integration tests and benchmarks.
pub mod test_utils;

pub use test_utils::{snapshot, Entry, SyncFixture, TreeBuilder};
