//! Console output for ContentSync CLI

use console::{style, StyledObject};
use contentsync_sync::{FolderDiffResult, SyncReport, Tone};
use contentsync_types::RelativePath;
use std::path::Path;
use std::time::Duration;

/// Announce a sync run
pub fn display_header(source: &Path, destination: &Path, dry_run: bool) {
    println!(
        "{} Synchronizing {} to {}",
        style("⟲").blue().bold(),
        style(source.display()).cyan(),
        style(destination.display()).cyan()
    );
    if dry_run {
        display_info("What-if mode - no changes will be made");
    }
}

/// Print the summary lines of a finished run, colored by tone
pub fn display_report(report: &SyncReport) {
    println!();
    for line in report.summary_lines() {
        println!("{}", tinted(line.tone, &line.text));
    }
    println!(
        "{}",
        style(format!("Finished in {}", format_duration(report.duration))).dim()
    );
}

fn tinted(tone: Tone, text: &str) -> StyledObject<&str> {
    match tone {
        Tone::Added => style(text).green(),
        Tone::Changed => style(text).yellow(),
        Tone::Removed => style(text).magenta(),
        Tone::Neutral => style(text).white(),
        Tone::Failure => style(text).red().bold(),
    }
}

/// Print every non-empty category of a diff
pub fn display_diff(diff: &FolderDiffResult) {
    if diff.are_fully_identical() {
        display_success(&format!(
            "Directories are identical ({} files)",
            diff.identical_files.len()
        ));
    }

    print_category("Left-only files", '+', &diff.left_only_files, Tone::Added);
    print_category("Changed files", '~', &diff.changed_files, Tone::Changed);
    print_category("Right-only files", '-', &diff.right_only_files, Tone::Removed);
    print_category("Left-only folders", '+', &diff.left_only_folders, Tone::Added);
    print_category("Right-only folders", '-', &diff.right_only_folders, Tone::Removed);
    print_category("Failed comparisons", '!', &diff.failed_comparisons, Tone::Failure);

    if !diff.identical_files.is_empty() && !diff.are_fully_identical() {
        println!(
            "{}",
            style(format!("{} identical files", diff.identical_files.len())).dim()
        );
    }
}

fn print_category(title: &str, marker: char, paths: &[RelativePath], tone: Tone) {
    if paths.is_empty() {
        return;
    }
    println!("{}", style(format!("{} ({}):", title, paths.len())).bold().underlined());
    for path in paths {
        let line = format!("  {} {}", marker, path);
        println!("{}", tinted(tone, &line));
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(1500), "1.50s")]
    #[case(Duration::from_secs(125), "2m 5s")]
    #[case(Duration::from_secs(3725), "1h 2m 5s")]
    fn test_format_duration(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }
}
