//! JSON output structures for ContentSync CLI

use contentsync_sync::{FolderDiffResult, SummaryLine, SyncReport};
use serde::Serialize;
use std::path::Path;

/// Operation metadata
#[derive(Debug, Serialize)]
pub struct OperationMetadata {
    /// ContentSync version
    pub version: String,
    /// Operation type
    pub operation: String,
    /// Timestamp when the output was produced
    pub timestamp: String,
    /// Source path
    pub source: String,
    /// Destination path
    pub destination: String,
}

impl OperationMetadata {
    fn new(operation: &str, source: &Path, destination: &Path) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            source: source.display().to_string(),
            destination: destination.display().to_string(),
        }
    }
}

/// Complete JSON output for a sync run
#[derive(Debug, Serialize)]
pub struct SyncJson<'a> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// The run report
    pub report: &'a SyncReport,
    /// Human-readable summary
    pub summary: Vec<SummaryLine>,
    /// Whether no failure was recorded
    pub success: bool,
}

impl<'a> SyncJson<'a> {
    /// Wrap a finished report
    pub fn new(report: &'a SyncReport) -> Self {
        Self {
            metadata: OperationMetadata::new("sync", &report.source, &report.destination),
            report,
            summary: report.summary_lines(),
            success: report.is_success(),
        }
    }
}

/// Complete JSON output for a diff
#[derive(Debug, Serialize)]
pub struct DiffJson<'a> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Whether only identical files were found
    pub fully_identical: bool,
    /// The categorized paths
    pub diff: &'a FolderDiffResult,
}

impl<'a> DiffJson<'a> {
    /// Wrap a diff result
    pub fn new(left: &Path, right: &Path, diff: &'a FolderDiffResult) -> Self {
        Self {
            metadata: OperationMetadata::new("diff", left, right),
            fully_identical: diff.are_fully_identical(),
            diff,
        }
    }
}
