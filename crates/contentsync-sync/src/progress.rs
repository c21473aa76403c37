//! Phase labels and timed sections for sync runs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Synchronization phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    /// Scanning source directory
    ScanningSource,
    /// Scanning destination directory
    ScanningDestination,
    /// Comparing matched file pairs
    Comparing,
    /// Sorting diff categories
    Sorting,
    /// Copying left-only files
    CopyingNewFiles,
    /// Overwriting changed files
    UpdatingChangedFiles,
    /// Deleting changed files
    DeletingChangedFiles,
    /// Deleting identical files
    DeletingIdenticalFiles,
    /// Deleting right-only files
    DeletingExtraFiles,
    /// Creating left-only folders
    CreatingFolders,
    /// Deleting right-only folders
    DeletingFolders,
}

impl SyncPhase {
    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::ScanningSource => "Scanning source directory",
            Self::ScanningDestination => "Scanning destination directory",
            Self::Comparing => "Comparing",
            Self::Sorting => "Sorting",
            Self::CopyingNewFiles => "Copying new files",
            Self::UpdatingChangedFiles => "Updating changed files",
            Self::DeletingChangedFiles => "Deleting changed files",
            Self::DeletingIdenticalFiles => "Deleting identical files",
            Self::DeletingExtraFiles => "Deleting extra files",
            Self::CreatingFolders => "Creating folders",
            Self::DeletingFolders => "Deleting folders",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Elapsed time of one completed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Phase that ran
    pub phase: SyncPhase,
    /// Wall-clock time spent in it
    pub elapsed: Duration,
}

/// Collects phase timings in completion order
#[derive(Debug, Default)]
pub struct PhaseTimer {
    timings: Mutex<Vec<PhaseTiming>>,
}

impl PhaseTimer {
    /// Create an empty timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a phase; it ends when the returned guard is dropped
    pub fn section(&self, phase: SyncPhase) -> TimedSection<'_> {
        debug!("{}...", phase);
        TimedSection {
            timer: self,
            phase,
            started: Instant::now(),
        }
    }

    /// Timings recorded so far
    pub fn timings(&self) -> Vec<PhaseTiming> {
        self.timings
            .lock()
            .map(|timings| timings.clone())
            .unwrap_or_default()
    }

    fn record(&self, timing: PhaseTiming) {
        if let Ok(mut timings) = self.timings.lock() {
            timings.push(timing);
        }
    }
}

/// Guard marking a running phase
#[derive(Debug)]
pub struct TimedSection<'a> {
    timer: &'a PhaseTimer,
    phase: SyncPhase,
    started: Instant,
}

impl Drop for TimedSection<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        debug!("{} took {:?}", self.phase, elapsed);
        self.timer.record(PhaseTiming {
            phase: self.phase,
            elapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_record_in_completion_order() {
        let timer = PhaseTimer::new();
        {
            let _scan = timer.section(SyncPhase::ScanningSource);
        }
        {
            let _compare = timer.section(SyncPhase::Comparing);
            std::thread::sleep(Duration::from_millis(2));
        }

        let timings = timer.timings();
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[0].phase, SyncPhase::ScanningSource);
        assert_eq!(timings[1].phase, SyncPhase::Comparing);
        assert!(timings[1].elapsed >= Duration::from_millis(2));
    }

    #[test]
    fn test_labels() {
        assert_eq!(SyncPhase::DeletingExtraFiles.label(), "Deleting extra files");
        assert_eq!(SyncPhase::ScanningDestination.to_string(), "Scanning destination directory");
    }
}
