//! Run reports and their human-readable summary

use crate::progress::PhaseTiming;
use chrono::{DateTime, Utc};
use contentsync_types::SyncCounters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one sync call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Identifier for correlating log lines of one run
    pub run_id: uuid::Uuid,
    /// Source root
    pub source: PathBuf,
    /// Destination root
    pub destination: PathBuf,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Whether the run was speculative
    pub dry_run: bool,
    /// Whether cancellation stopped the run early
    pub cancelled: bool,
    /// Whether the destination was (or would have been) modified
    pub changes_made: bool,
    /// Whether source and destination matched before the run
    pub fully_identical: bool,
    /// Whether destination entries were dropped from the listing cache
    pub cache_cleared: bool,
    /// Number of identical files found by the diff
    pub identical_files: u64,
    /// Success and failure tallies
    pub counters: SyncCounters,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Per-phase timings in completion order
    pub timings: Vec<PhaseTiming>,
    /// Set by single-file sync when nothing needed copying
    pub contents_identical: bool,
    /// Whether identical files were deleted rather than just counted
    #[serde(default)]
    pub deleted_identical: bool,
}

impl SyncReport {
    /// Create an empty report for a run starting now
    pub fn new(source: PathBuf, destination: PathBuf, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            source,
            destination,
            started_at: Utc::now(),
            dry_run,
            cancelled: false,
            changes_made: false,
            fully_identical: false,
            cache_cleared: false,
            identical_files: 0,
            counters: SyncCounters::new(),
            duration: Duration::ZERO,
            timings: Vec::new(),
            contents_identical: false,
            deleted_identical: false,
        }
    }

    /// Whether every failure counter is zero
    pub fn is_success(&self) -> bool {
        !self.counters.has_failures()
    }

    /// Report lines in display order
    pub fn summary_lines(&self) -> Vec<SummaryLine> {
        let c = &self.counters;
        let would = self.dry_run;
        let mut lines = Vec::new();

        if self.contents_identical {
            lines.push(SummaryLine::new(Tone::Neutral, "File contents are identical."));
        }

        push_action(&mut lines, Tone::Added, would, c.files_copied, "new file", "copied");
        push_action(&mut lines, Tone::Added, would, c.folders_created, "folder", "created");
        push_action(&mut lines, Tone::Changed, would, c.files_updated, "changed file", "updated");
        push_action(
            &mut lines,
            Tone::Changed,
            would,
            c.changed_files_deleted,
            "changed file",
            "deleted",
        );
        push_action(
            &mut lines,
            Tone::Removed,
            would,
            c.right_only_files_deleted,
            "right-only file",
            "deleted",
        );
        push_action(
            &mut lines,
            Tone::Removed,
            would,
            c.folders_deleted,
            "right-only folder",
            "deleted",
        );

        if self.deleted_identical && c.identical_files_deleted > 0 {
            let n = c.identical_files_deleted;
            let noun = pluralize("file", n);
            let text = if would {
                format!("Would have deleted {} identical {} from destination", n, noun)
            } else {
                format!("{} identical {} deleted from destination", n, noun)
            };
            lines.push(SummaryLine::new(Tone::Neutral, text));
        } else if self.identical_files > 0 {
            let n = self.identical_files;
            lines.push(SummaryLine::new(
                Tone::Neutral,
                format!("{} identical {}", n, pluralize("file", n)),
            ));
        }

        push_failure(&mut lines, c.files_failed_to_copy, "Failed to copy", "file", "");
        push_failure(&mut lines, c.files_failed_to_delete, "Failed to delete", "file", ".");
        push_failure(&mut lines, c.folders_failed_to_create, "Failed to create", "folder", ".");
        push_failure(&mut lines, c.folders_failed_to_delete, "Failed to delete", "folder", ".");
        push_failure(&mut lines, c.comparisons_failed, "Failed to compare", "file", ".");

        if self.cancelled {
            lines.push(SummaryLine::new(Tone::Failure, "Cancelled before completion."));
        }

        if !self.changes_made {
            let text = if would {
                "Would have made no changes."
            } else {
                "Made no changes."
            };
            lines.push(SummaryLine::new(Tone::Neutral, text));
        }

        lines
    }
}

/// Display hint for a summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    /// Something was added to the destination
    Added,
    /// Something in the destination was replaced or removed for being stale
    Changed,
    /// Something extra was removed from the destination
    Removed,
    /// Informational
    Neutral,
    /// Something failed
    Failure,
}

/// One line of a run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    /// Display hint
    pub tone: Tone,
    /// Message text
    pub text: String,
}

impl SummaryLine {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// `word` for one, `words` otherwise
pub fn pluralize(word: &str, count: u64) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

fn push_action(
    lines: &mut Vec<SummaryLine>,
    tone: Tone,
    would: bool,
    count: u64,
    noun: &str,
    verb: &str,
) {
    if count == 0 {
        return;
    }
    let noun = pluralize(noun, count);
    let text = if would {
        format!("Would have {} {} {}", verb, count, noun)
    } else {
        format!("{} {} {}", count, noun, verb)
    };
    lines.push(SummaryLine::new(tone, text));
}

fn push_failure(lines: &mut Vec<SummaryLine>, count: u64, prefix: &str, noun: &str, end: &str) {
    if count > 0 {
        lines.push(SummaryLine::new(
            Tone::Failure,
            format!("{} {} {}{}", prefix, count, pluralize(noun, count), end),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(report: &SyncReport) -> Vec<String> {
        report.summary_lines().into_iter().map(|l| l.text).collect()
    }

    fn report(dry_run: bool) -> SyncReport {
        SyncReport::new(PathBuf::from("src"), PathBuf::from("dst"), dry_run)
    }

    #[test]
    fn test_no_changes() {
        assert_eq!(texts(&report(false)), vec!["Made no changes."]);
        assert_eq!(texts(&report(true)), vec!["Would have made no changes."]);
    }

    #[test]
    fn test_real_run_lines() {
        let mut report = report(false);
        report.changes_made = true;
        report.counters.files_copied = 1;
        report.counters.folders_created = 2;
        report.counters.files_updated = 3;
        report.counters.right_only_files_deleted = 1;
        report.counters.folders_deleted = 1;
        report.identical_files = 4;

        assert_eq!(
            texts(&report),
            vec![
                "1 new file copied",
                "2 folders created",
                "3 changed files updated",
                "1 right-only file deleted",
                "1 right-only folder deleted",
                "4 identical files",
            ]
        );
    }

    #[test]
    fn test_dry_run_lines() {
        let mut report = report(true);
        report.changes_made = true;
        report.counters.files_copied = 2;
        report.counters.folders_created = 1;
        report.counters.files_updated = 1;
        report.counters.changed_files_deleted = 1;
        report.counters.identical_files_deleted = 3;
        report.deleted_identical = true;

        assert_eq!(
            texts(&report),
            vec![
                "Would have copied 2 new files",
                "Would have created 1 folder",
                "Would have updated 1 changed file",
                "Would have deleted 1 changed file",
                "Would have deleted 3 identical files from destination",
            ]
        );
    }

    #[test]
    fn test_failure_lines() {
        let mut report = report(false);
        report.changes_made = true;
        report.counters.files_failed_to_copy = 2;
        report.counters.files_failed_to_delete = 1;
        report.counters.folders_failed_to_create = 1;
        report.counters.folders_failed_to_delete = 3;
        report.counters.comparisons_failed = 1;

        let lines = report.summary_lines();
        assert!(lines.iter().all(|l| l.tone == Tone::Failure));
        assert_eq!(
            lines.into_iter().map(|l| l.text).collect::<Vec<_>>(),
            vec![
                "Failed to copy 2 files",
                "Failed to delete 1 file.",
                "Failed to create 1 folder.",
                "Failed to delete 3 folders.",
                "Failed to compare 1 file.",
            ]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("file", 1), "file");
        assert_eq!(pluralize("file", 0), "files");
        assert_eq!(pluralize("folder", 2), "folders");
    }
}
