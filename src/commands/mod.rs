pub mod clean;
pub mod config_cmd;
pub mod scan;

pub use clean::execute_clean;
pub use config_cmd::execute_config;
pub use scan::execute_scan;

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Config, Settings, home_dir};
use crate::error::AppError;
use crate::events::{ConsoleSink, EventSink, MilestoneLog, Tee};
use crate::format::humanize_bytes;
use crate::model::{CleanupAction, UsageEntry};
use crate::path::display_path;

/// Options shared by every command that scans.
#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub roots: Vec<PathBuf>,
    pub depth: Option<usize>,
    pub limit: Option<usize>,
    pub min_cleanup: Option<u64>,
    pub walk: bool,
    pub verbose: bool,
}

impl CommonOptions {
    pub fn roots(&self) -> Option<Vec<PathBuf>> {
        if self.roots.is_empty() { None } else { Some(self.roots.clone()) }
    }
}

fn load_settings(options: &CommonOptions) -> Result<Settings, AppError> {
    let home = home_dir()?;
    let mut settings = Config::load()?.settings(&home)?;
    if let Some(min_cleanup) = options.min_cleanup {
        settings.min_cleanup_bytes = min_cleanup;
    }
    Ok(settings)
}

fn open_sink(settings: &Settings, verbose: bool) -> Box<dyn EventSink> {
    let console = ConsoleSink { verbose };
    match &settings.milestone_log {
        Some(path) => Box::new(Tee(console, MilestoneLog::new(path))),
        None => Box::new(console),
    }
}

fn spinner(hidden: bool, message: &'static str) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_entries(entries: &[UsageEntry]) {
    if entries.is_empty() {
        println!("No usage entries found.");
        return;
    }
    for entry in entries {
        println!("  {:>6}  {}", entry.human_size, display_path(&entry.path));
    }
}

fn print_actions(actions: &[CleanupAction], total: u64) {
    for action in actions {
        println!(
            "  • {:<60} {:>6}  (safe root: {})",
            display_path(&action.path),
            action.human_freed,
            display_path(&action.safe_root)
        );
    }
    println!("Total freed: {}", humanize_bytes(total));
}
