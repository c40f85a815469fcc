use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use hygiene::commands::{clean::CleanOptions, config_cmd::ConfigOptions, scan::ScanOptions};
use hygiene::commands::{CommonOptions, execute_clean, execute_config, execute_scan};
use hygiene::error::AppError;
use hygiene::format::parse_size;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let options = ScanOptions {
                common: args.common.into_options()?,
                auto_cleanup: !args.no_cleanup,
                dry_run: args.dry_run,
                json: args.json,
            };
            execute_scan(options)?;
        }
        Commands::Clean(args) => {
            let options = CleanOptions {
                common: args.common.into_options()?,
                assume_yes: args.yes,
                dry_run: args.dry_run,
            };
            execute_clean(options)?;
        }
        Commands::Config(args) => {
            let options = ConfigOptions {
                show_path: args.path,
                edit: args.edit,
                init: args.init,
                add_exclude: args.exclude,
            };
            execute_config(options)?;
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "hygiene",
    version,
    about = "Rank disk usage and reclaim space from cache directories."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the heaviest directories and clean up safe cache locations.
    #[command(alias = "sc")]
    Scan(ScanArgs),
    /// Show a cleanup plan, confirm it, then delete.
    #[command(alias = "cl")]
    Clean(CleanArgs),
    /// Show or manage hygiene configuration.
    #[command(alias = "cfg")]
    Config(ConfigArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Directory levels to report below each scan root.
    #[arg(short, long, value_name = "N")]
    depth: Option<usize>,

    /// Keep only the N heaviest entries.
    #[arg(short, long, value_name = "N")]
    limit: Option<usize>,

    /// Minimum size worth cleaning, e.g. 200MiB (trash is always eligible).
    #[arg(long = "min-cleanup", value_name = "SIZE")]
    min_cleanup: Option<String>,

    /// Measure usage in-process instead of running `du`.
    #[arg(long = "walk", action = ArgAction::SetTrue)]
    walk: bool,

    /// Print every observation while scanning.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Directories to scan (defaults to the configured scan roots).
    #[arg(value_name = "PATH", num_args = 0..)]
    paths: Vec<PathBuf>,
}

impl CommonArgs {
    fn into_options(self) -> Result<CommonOptions, AppError> {
        let min_cleanup = self.min_cleanup.as_deref().map(parse_size).transpose()?;
        Ok(CommonOptions {
            roots: self.paths,
            depth: self.depth,
            limit: self.limit,
            min_cleanup,
            walk: self.walk,
            verbose: self.verbose,
        })
    }
}

#[derive(Args)]
struct ScanArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Only report; do not clean anything up.
    #[arg(long = "no-cleanup", action = ArgAction::SetTrue)]
    no_cleanup: bool,

    /// Report what cleanup would remove without deleting.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Print the report as JSON.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args)]
struct CleanArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    yes: bool,

    /// Show the plan and stop.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Show the configuration file path.
    #[arg(long = "path", action = ArgAction::SetTrue)]
    path: bool,

    /// Open the configuration file in $EDITOR.
    #[arg(long = "edit", action = ArgAction::SetTrue)]
    edit: bool,

    /// Write a configuration file with every default spelled out.
    #[arg(long = "init", action = ArgAction::SetTrue)]
    init: bool,

    /// Never clean paths matching this glob (e.g. "~/.cache/keep/**").
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Option<String>,
}
