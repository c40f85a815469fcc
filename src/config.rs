use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs_next as dirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::format::parse_size;
use crate::path::expand_home;

pub const DEFAULT_DEPTH: usize = 3;
pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_MIN_CLEANUP_BYTES: u64 = 200 * 1024 * 1024;
pub const DEFAULT_DF_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_DU_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_PROTECTED: &[&str] = &["com.apple*"];

const DEFAULT_SCAN_ROOTS: &[&str] = &[
    "~/Downloads",
    "~/Documents",
    "~/Desktop",
    "~/Library/Caches",
    "~/Library/Logs",
    "~/Library/Developer/Xcode/DerivedData",
    "~/repos",
    "~/.cache",
];

const DEFAULT_SAFE_ROOTS: &[&str] =
    &["~/Library/Caches", "~/Library/Logs", "~/Library/Developer/Xcode/DerivedData", "~/.cache"];

const DEFAULT_TRASH_ROOTS: &[&str] = &["~/.Trash", "~/.local/share/Trash"];

/// On-disk configuration. Every key is optional and falls back to a built-in default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_roots: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_roots: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_roots: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Minimum candidate size worth removing, e.g. `"200 MiB"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cleanup: Option<String>,
    /// Globs matched against each path segment; a hit makes the path untouchable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<Vec<String>>,
    /// Globs matched against the full path; a hit makes the path untouchable.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub df_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub du_timeout_secs: Option<u64>,
}

/// Fully resolved settings handed to the engine. Paths are expanded but not yet filtered
/// for existence; that happens at scan and cleanup time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub home: PathBuf,
    pub scan_roots: Vec<PathBuf>,
    pub safe_roots: Vec<PathBuf>,
    pub trash_roots: Vec<PathBuf>,
    pub depth: usize,
    pub limit: usize,
    pub min_cleanup_bytes: u64,
    pub protected: GlobSet,
    pub exclude: Option<GlobSet>,
    pub summary_log: Option<PathBuf>,
    pub milestone_log: Option<PathBuf>,
    pub df_timeout: Duration,
    pub du_timeout: Duration,
}

impl Settings {
    /// Built-in defaults rooted at `home`, with no log files.
    pub fn with_home(home: impl Into<PathBuf>) -> Result<Self, AppError> {
        Config::default().settings(&home.into())
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let path = config_file_path()?;
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let path = config_file_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::File::create(path)?;
        let contents = toml::to_string_pretty(self)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// The configuration with every default spelled out, as written by `config --init`.
    pub fn with_defaults() -> Self {
        Config {
            scan_roots: Some(to_paths(DEFAULT_SCAN_ROOTS)),
            safe_roots: Some(to_paths(DEFAULT_SAFE_ROOTS)),
            trash_roots: Some(to_paths(DEFAULT_TRASH_ROOTS)),
            depth: Some(DEFAULT_DEPTH),
            limit: Some(DEFAULT_LIMIT),
            min_cleanup: Some("200 MiB".to_string()),
            protected: Some(DEFAULT_PROTECTED.iter().map(|p| (*p).to_string()).collect()),
            exclude: Vec::new(),
            summary_log: None,
            milestone_log: None,
            df_timeout_secs: Some(DEFAULT_DF_TIMEOUT_SECS),
            du_timeout_secs: Some(DEFAULT_DU_TIMEOUT_SECS),
        }
    }

    pub fn settings(&self, home: &Path) -> Result<Settings, AppError> {
        let expand = |paths: &Option<Vec<PathBuf>>, defaults: &[&str]| -> Vec<PathBuf> {
            match paths {
                Some(paths) => paths.iter().map(|p| expand_home(p, home)).collect(),
                None => defaults.iter().map(|p| expand_home(Path::new(p), home)).collect(),
            }
        };

        let min_cleanup_bytes = match &self.min_cleanup {
            Some(value) => parse_size(value)?,
            None => DEFAULT_MIN_CLEANUP_BYTES,
        };

        let protected_patterns: Vec<String> = match &self.protected {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_PROTECTED.iter().map(|p| (*p).to_string()).collect(),
        };

        Ok(Settings {
            home: home.to_path_buf(),
            scan_roots: expand(&self.scan_roots, DEFAULT_SCAN_ROOTS),
            safe_roots: expand(&self.safe_roots, DEFAULT_SAFE_ROOTS),
            trash_roots: expand(&self.trash_roots, DEFAULT_TRASH_ROOTS),
            depth: self.depth.unwrap_or(DEFAULT_DEPTH),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            min_cleanup_bytes,
            protected: compile_globs(&protected_patterns, None)?,
            exclude: self.compile_excludes(home)?,
            summary_log: self.summary_log.as_ref().map(|p| expand_home(p, home)),
            milestone_log: self.milestone_log.as_ref().map(|p| expand_home(p, home)),
            df_timeout: Duration::from_secs(
                self.df_timeout_secs.unwrap_or(DEFAULT_DF_TIMEOUT_SECS),
            ),
            du_timeout: Duration::from_secs(
                self.du_timeout_secs.unwrap_or(DEFAULT_DU_TIMEOUT_SECS),
            ),
        })
    }

    /// Append an exclude pattern unless it is already present. Returns whether it was added.
    pub fn add_exclude(&mut self, pattern: String) -> bool {
        if self.exclude.contains(&pattern) {
            return false;
        }
        self.exclude.push(pattern);
        true
    }

    pub fn compile_excludes(&self, home: &Path) -> Result<Option<GlobSet>, AppError> {
        if self.exclude.is_empty() {
            return Ok(None);
        }
        Ok(Some(compile_globs(&self.exclude, Some(home))?))
    }
}

/// Compile `patterns`. With a `home`, each pattern is `~`-expanded and also added with its
/// literal prefix resolved, since candidates are matched in canonical form.
fn compile_globs(patterns: &[String], home: Option<&Path>) -> Result<GlobSet, AppError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let Some(home) = home else {
            builder.add(Glob::new(pattern)?);
            continue;
        };
        let expanded = expand_home(Path::new(pattern), home);
        builder.add(Glob::new(&expanded.display().to_string())?);
        if let Some(anchored) = canonical_pattern(&expanded)
            && anchored != expanded
        {
            builder.add(Glob::new(&anchored.display().to_string())?);
        }
    }
    Ok(builder.build()?)
}

/// Resolve the leading glob-free components of an absolute pattern, keeping the rest as is.
fn canonical_pattern(pattern: &Path) -> Option<PathBuf> {
    if !pattern.is_absolute() {
        return None;
    }
    let mut literal = PathBuf::new();
    let mut rest = PathBuf::new();
    for part in pattern.components() {
        let text = part.as_os_str().to_string_lossy();
        if rest.as_os_str().is_empty() && !text.contains(['*', '?', '[', '{']) {
            literal.push(part);
        } else {
            rest.push(part);
        }
    }
    let resolved = fs::canonicalize(&literal).ok()?;
    Some(if rest.as_os_str().is_empty() { resolved } else { resolved.join(rest) })
}

fn to_paths(values: &[&str]) -> Vec<PathBuf> {
    values.iter().map(PathBuf::from).collect()
}

pub fn home_dir() -> Result<PathBuf, AppError> {
    dirs::home_dir()
        .ok_or_else(|| AppError::config("Unable to determine the home directory for this user"))
}

pub fn config_file_path() -> Result<PathBuf, AppError> {
    let config_root = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .ok_or_else(|| {
            AppError::config("Unable to determine configuration directory for this platform")
        })?;
    Ok(config_root.join("hygiene").join("config.toml"))
}

pub fn ensure_config_file() -> Result<PathBuf, AppError> {
    let path = config_file_path()?;
    if !path.exists() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = toml::to_string_pretty(&Config::with_defaults())?;
        fs::write(&path, contents)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_against_home() {
        let settings = Config::default().settings(Path::new("/home/demo")).unwrap();
        assert_eq!(settings.depth, DEFAULT_DEPTH);
        assert_eq!(settings.limit, DEFAULT_LIMIT);
        assert_eq!(settings.min_cleanup_bytes, DEFAULT_MIN_CLEANUP_BYTES);
        assert!(settings.trash_roots.contains(&PathBuf::from("/home/demo/.Trash")));
        assert!(settings.protected.is_match("com.apple.Safari"));
        assert!(settings.exclude.is_none());
    }

    #[test]
    fn toml_overrides_are_applied() {
        let config: Config = toml::from_str(
            r#"
            safe_roots = ["~/scratch"]
            min_cleanup = "1 MiB"
            depth = 1
            exclude = ["~/scratch/keep/**"]
            "#,
        )
        .unwrap();
        let settings = config.settings(Path::new("/home/demo")).unwrap();
        assert_eq!(settings.safe_roots, vec![PathBuf::from("/home/demo/scratch")]);
        assert_eq!(settings.min_cleanup_bytes, 1024 * 1024);
        assert_eq!(settings.depth, 1);
        let exclude = settings.exclude.unwrap();
        assert!(exclude.is_match("/home/demo/scratch/keep/a.log"));
    }

    #[cfg(unix)]
    #[test]
    fn excludes_match_through_symlinked_prefixes() {
        let temp = tempfile::tempdir().unwrap();
        let real = temp.path().join("real");
        fs::create_dir_all(real.join("keep")).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let config = Config {
            exclude: vec![format!("{}/keep/**", link.display())],
            ..Config::default()
        };
        let exclude = config.compile_excludes(temp.path()).unwrap().unwrap();
        let canonical = fs::canonicalize(&real).unwrap().join("keep/state.db");
        assert!(exclude.is_match(&canonical));
        assert!(exclude.is_match(link.join("keep/state.db")));
    }

    #[test]
    fn add_exclude_skips_duplicates() {
        let mut config = Config::default();
        assert!(config.add_exclude("~/.cache/keep/**".into()));
        assert!(!config.add_exclude("~/.cache/keep/**".into()));
        assert_eq!(config.exclude.len(), 1);
    }

    #[test]
    fn bad_size_is_rejected() {
        let config = Config { min_cleanup: Some("huge".into()), ..Config::default() };
        assert!(matches!(config.settings(Path::new("/h")), Err(AppError::InvalidSize(_))));
    }
}
