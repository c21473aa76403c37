//! ContentSync - one-way directory synchronizer
//!
//! Diffs a source tree against a destination and applies the selected
//! categories of changes: copy new files, update or delete changed ones,
//! delete identical or extra ones, create and remove folders.

mod display;
mod json_output;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use contentsync_config::{Config, ConfigBuilder, ConfigLoader, SyncPolicy};
use contentsync_sync::{DiffEngine, DiffOptions, DiskListingCache, ListingCache, SyncEngine};
use contentsync_types::WorkerCount;
use json_output::{DiffJson, SyncJson};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// ContentSync - one-way directory synchronizer
#[derive(Parser)]
#[command(
    name = "contentsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way directory synchronizer",
    long_about = "ContentSync makes a destination directory match a source directory.\n\
                  It compares file contents, copies what is new or changed and removes\n\
                  what the source no longer has. Use --what-if to preview a run."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make a destination match a source directory or file
    Sync {
        /// Source directory or file
        source: PathBuf,
        /// Destination directory or file
        destination: PathBuf,
        /// Only report what would be done
        #[arg(long, visible_alias = "dry-run")]
        what_if: bool,
        #[command(flatten)]
        categories: CategoryArgs,
        #[command(flatten)]
        scan: ScanArgs,
        /// Number of files compared at once
        #[arg(short, long)]
        workers: Option<usize>,
        /// Do not read or write the listing cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Show how two directories differ without changing anything
    Diff {
        /// Left (source) directory
        left: PathBuf,
        /// Right (destination) directory
        right: PathBuf,
        #[command(flatten)]
        scan: ScanArgs,
        /// Compare contents of files present on both sides
        #[arg(long)]
        contents: bool,
    },
    /// Manage the listing cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Write the configuration to a file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached listing
    Clear,
}

/// Change categories; when any is given only the given ones run
#[derive(Args, Default)]
struct CategoryArgs {
    /// Copy files that only exist in the source
    #[arg(long)]
    copy_new: bool,
    /// Overwrite changed files in the destination
    #[arg(long)]
    update_changed: bool,
    /// Delete changed files from the destination
    #[arg(long)]
    delete_changed: bool,
    /// Delete identical files from the destination
    #[arg(long)]
    delete_same: bool,
    /// Delete files that only exist in the destination
    #[arg(long)]
    delete_extra: bool,
    /// Create folders that only exist in the source
    #[arg(long)]
    create_folders: bool,
    /// Delete folders that only exist in the destination
    #[arg(long)]
    delete_extra_folders: bool,
}

impl CategoryArgs {
    fn any(&self) -> bool {
        self.copy_new
            || self.update_changed
            || self.delete_changed
            || self.delete_same
            || self.delete_extra
            || self.create_folders
            || self.delete_extra_folders
    }

    fn apply(&self, policy: SyncPolicy) -> SyncPolicy {
        if !self.any() {
            return policy;
        }
        policy
            .with_copy_left_only(self.copy_new)
            .with_update_changed(self.update_changed)
            .with_delete_changed(self.delete_changed)
            .with_delete_identical(self.delete_same)
            .with_delete_right_only_files(self.delete_extra)
            .with_create_empty_folders(self.create_folders)
            .with_delete_right_only_folders(self.delete_extra_folders)
    }
}

#[derive(Args, Default)]
struct ScanArgs {
    /// File name pattern, e.g. "*.txt"
    #[arg(short, long)]
    pattern: Option<String>,
    /// Only look at the top level of each directory
    #[arg(long)]
    non_recursive: bool,
    /// Treat files with equal contents as identical regardless of their dates
    #[arg(long)]
    ignore_date: bool,
    /// Compare paths case-sensitively
    #[arg(long)]
    case_sensitive: bool,
}

impl ScanArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(pattern) = &self.pattern {
            config.policy.pattern.clone_from(pattern);
        }
        if self.non_recursive {
            config.policy.recursive = false;
        }
        if self.ignore_date {
            config.policy.respect_date = false;
        }
        if self.case_sensitive {
            config.scan.case_sensitive = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.quiet) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    debug!("ContentSync v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            display::display_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Sync {
            source,
            destination,
            what_if,
            categories,
            scan,
            workers,
            no_cache,
        } => {
            let mut config = config;
            config.policy = categories.apply(config.policy);
            if what_if {
                config.policy.dry_run = true;
            }
            scan.apply(&mut config);
            if let Some(workers) = workers {
                config.performance.max_workers = WorkerCount::new(workers).map_err(anyhow::Error::msg)?;
            }
            if no_cache {
                config.cache.enabled = false;
            }
            ConfigBuilder::validate(&config)?;
            sync_command(&config, &source, &destination, cli.json, cli.quiet).await
        }
        Commands::Diff {
            left,
            right,
            scan,
            contents,
        } => {
            let mut config = config;
            scan.apply(&mut config);
            ConfigBuilder::validate(&config)?;
            diff_command(&config, &left, &right, contents, cli.json).await
        }
        Commands::Cache {
            action: CacheAction::Clear,
        } => cache_clear_command(&config, cli.json),
        Commands::Config { default, output } => {
            let config = if default { Config::default() } else { config };
            config_command(&config, output.as_deref())
        }
    }
}

fn init_logging(debug: bool, quiet: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(anyhow::Error::msg)?;

    Ok(())
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, finishing current operation");
            token.cancel();
        }
    });
    cancel
}

async fn sync_command(
    config: &Config,
    source: &Path,
    destination: &Path,
    json: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let engine = SyncEngine::from_config(config)?;
    let cancel = cancel_on_ctrl_c();

    if !json && !quiet {
        display::display_header(source, destination, config.policy.dry_run);
    }

    let report = if source.is_file() {
        engine
            .sync_file(source, destination, &config.policy, &cancel)
            .await?
    } else if source.is_dir() {
        engine
            .sync(source, destination, &config.policy, &cancel)
            .await?
    } else {
        bail!("Source '{}' does not exist", source.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&SyncJson::new(&report))?);
    } else if !quiet {
        display::display_report(&report);
    }

    info!(
        "Sync finished with {} failures",
        report.counters.total_failures()
    );
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn diff_command(
    config: &Config,
    left: &Path,
    right: &Path,
    contents: bool,
    json: bool,
) -> Result<ExitCode> {
    let engine = SyncEngine::from_config(config)?;
    let diff_engine: &DiffEngine = engine.diff_engine();
    let options = DiffOptions::from_policy(&config.policy).with_compare_contents(contents);
    let cancel = cancel_on_ctrl_c();

    let diff = diff_engine.diff(left, right, &options, &cancel).await?;

    if json {
        let output = DiffJson::new(left, right, &diff);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        display::display_diff(&diff);
    }

    Ok(if diff.failed_comparisons.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn cache_clear_command(config: &Config, json: bool) -> Result<ExitCode> {
    let directory = config.cache.resolved_directory();
    let removed = if directory.exists() {
        DiskListingCache::new(&directory)?.clear()?
    } else {
        0
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "directory": directory, "removed": removed })
        );
    } else {
        display::display_success(&format!(
            "Removed {} cached {} from {}",
            removed,
            contentsync_sync::pluralize("listing", removed as u64),
            directory.display()
        ));
    }
    Ok(ExitCode::SUCCESS)
}

fn config_command(config: &Config, output: Option<&Path>) -> Result<ExitCode> {
    if let Some(path) = output {
        ConfigLoader::save_to_file(config, path)?;
        display::display_success(&format!("Configuration written to {}", path.display()));
    } else {
        print!("{}", serde_yaml::to_string(config)?);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_category_flags_keep_policy() {
        let policy = CategoryArgs::default().apply(SyncPolicy::mirror());
        assert_eq!(policy, SyncPolicy::mirror());
    }

    #[test]
    fn test_category_flags_select_only_given() {
        let args = CategoryArgs {
            copy_new: true,
            delete_extra: true,
            ..CategoryArgs::default()
        };
        let policy = args.apply(SyncPolicy::mirror());
        assert!(policy.copy_left_only);
        assert!(policy.delete_right_only_files);
        assert!(!policy.update_changed);
        assert!(!policy.create_empty_folders);
        assert!(!policy.delete_right_only_folders);
    }

    #[test]
    fn test_parse_sync_arguments() {
        let cli = Cli::try_parse_from([
            "contentsync",
            "sync",
            "src",
            "dst",
            "--dry-run",
            "--pattern",
            "*.txt",
            "--non-recursive",
            "--workers",
            "4",
        ])
        .unwrap();

        let Commands::Sync {
            what_if,
            scan,
            workers,
            ..
        } = cli.command
        else {
            panic!("expected sync");
        };
        assert!(what_if);
        assert_eq!(scan.pattern.as_deref(), Some("*.txt"));
        assert!(scan.non_recursive);
        assert_eq!(workers, Some(4));
    }

    #[test]
    fn test_scan_args_override_config() {
        let mut config = Config::default();
        ScanArgs {
            pattern: Some("*.md".into()),
            non_recursive: true,
            ignore_date: true,
            case_sensitive: true,
        }
        .apply(&mut config);

        assert_eq!(config.policy.pattern, "*.md");
        assert!(!config.policy.recursive);
        assert!(!config.policy.respect_date);
        assert!(config.scan.case_sensitive);
    }
}
