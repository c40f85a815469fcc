use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{Config, Settings, config_file_path, ensure_config_file, home_dir};
use crate::error::AppError;
use crate::format::humanize_bytes;
use crate::path::display_path;

pub struct ConfigOptions {
    pub show_path: bool,
    pub edit: bool,
    pub init: bool,
    pub add_exclude: Option<String>,
}

pub fn execute_config(options: ConfigOptions) -> Result<(), AppError> {
    let path = config_file_path()?;
    let mut acted = false;

    if options.show_path {
        println!("Configuration file: {}", display_path(&path));
        acted = true;
    }

    if options.init {
        if path.exists() {
            println!("Configuration already exists at {}.", display_path(&path));
        } else {
            ensure_config_file()?;
            println!("Wrote default configuration to {}.", display_path(&path));
        }
        acted = true;
    }

    if let Some(pattern) = options.add_exclude {
        let mut config = Config::load()?;
        if config.add_exclude(pattern.clone()) {
            config.compile_excludes(&home_dir()?)?;
            config.save()?;
            println!("Excluding '{pattern}' from cleanup.");
        } else {
            println!("'{pattern}' is already excluded.");
        }
        acted = true;
    }

    if options.edit {
        let path = ensure_config_file()?;
        launch_editor(&path)?;
        acted = true;
    }

    if !acted {
        println!("Configuration file: {}", display_path(&path));
        let settings = Config::load()?.settings(&home_dir()?)?;
        print_settings(&settings);
    }

    Ok(())
}

fn print_settings(settings: &Settings) {
    let roots = |label: &str, paths: &[PathBuf]| {
        println!("{label}:");
        if paths.is_empty() {
            println!("  (none)");
        }
        for path in paths {
            let marker = if path.exists() { "" } else { "  (missing)" };
            println!("  {}{marker}", display_path(path));
        }
    };

    roots("Scan roots", &settings.scan_roots);
    roots("Safe cleanup roots", &settings.safe_roots);
    roots("Trash roots", &settings.trash_roots);
    println!("Depth: {}", settings.depth);
    println!("Limit: {}", settings.limit);
    println!("Minimum cleanup size: {}", humanize_bytes(settings.min_cleanup_bytes));
    if let Some(log) = &settings.summary_log {
        println!("Summary log: {}", display_path(log));
    }
    if let Some(log) = &settings.milestone_log {
        println!("Milestone log: {}", display_path(log));
    }
}

fn launch_editor(path: &Path) -> Result<(), AppError> {
    let editor = ["VISUAL", "EDITOR"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| "nano".to_string());

    let status = Command::new(&editor)
        .arg(path)
        .status()
        .map_err(|err| AppError::Editor(format!("{editor}: {err}")))?;

    if !status.success() {
        return Err(AppError::Editor(format!("{editor} exited with status {status}")));
    }
    Ok(())
}
