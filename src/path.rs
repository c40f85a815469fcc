use std::fs;
use std::path::{Component, Path, PathBuf};

use dirs_next as dirs;

/// Replace the home directory prefix with `~` to make output easier to read.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        let mut display = PathBuf::from("~");
        display.push(stripped);
        return display.display().to_string();
    }

    path.display().to_string()
}

/// Expand a leading `~` or `~/` against `home`.
pub fn expand_home(value: &Path, home: &Path) -> PathBuf {
    match value.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => value.to_path_buf(),
    }
}

/// Expand, absolutize and resolve `candidate`.
///
/// Symlinks are resolved when the path exists; otherwise `.` and `..` are folded lexically.
pub fn normalize_path(candidate: &Path, home: &Path) -> PathBuf {
    let expanded = expand_home(candidate, home);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    };

    fs::canonicalize(&absolute).unwrap_or_else(|_| lexical_clean(&absolute))
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Normalize `roots`, collapse exact duplicates and drop the ones that do not exist.
pub fn resolve_existing(roots: &[PathBuf], home: &Path) -> Vec<PathBuf> {
    let mut resolved: Vec<PathBuf> = Vec::new();
    for root in roots {
        let normalized = normalize_path(root, home);
        if normalized.exists() && !resolved.contains(&normalized) {
            resolved.push(normalized);
        }
    }
    resolved
}
