//! The single authorization boundary for destructive action.
//!
//! A path may only be removed when it sits inside a configured safe root and passes
//! [`SafetyGate::is_removable`] at the moment of removal. Both checks read live filesystem
//! state; nothing here trusts earlier scan results.

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;

use crate::config::Settings;
use crate::model::SafeRoot;
use crate::path::normalize_path;

pub struct SafetyGate {
    safe_roots: Vec<SafeRoot>,
    protected: GlobSet,
    exclude: Option<GlobSet>,
    home: PathBuf,
}

impl SafetyGate {
    /// Build the gate from resolved settings. Safe roots keep their configured order with
    /// cache roots ahead of trash roots; roots that do not exist are dropped.
    ///
    /// A root is a trash root when the trash list names it or its directory is `.Trash`,
    /// whichever list it appears in first.
    pub fn new(settings: &Settings) -> Self {
        let home = normalize_path(&settings.home, &settings.home);
        let mut safe_roots: Vec<SafeRoot> = Vec::new();
        let tagged = settings
            .safe_roots
            .iter()
            .map(|path| (path, false))
            .chain(settings.trash_roots.iter().map(|path| (path, true)));

        for (path, listed_as_trash) in tagged {
            let path = normalize_path(path, &settings.home);
            if !path.is_dir() {
                continue;
            }
            let trash = listed_as_trash || path.file_name().is_some_and(|name| name == ".Trash");
            match safe_roots.iter_mut().find(|root| root.path == path) {
                Some(existing) => existing.trash |= trash,
                None => safe_roots.push(SafeRoot { path, trash }),
            }
        }

        Self {
            safe_roots,
            protected: settings.protected.clone(),
            exclude: settings.exclude.clone(),
            home,
        }
    }

    pub fn safe_roots(&self) -> &[SafeRoot] {
        &self.safe_roots
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// First safe root, in configured order, that is `path` or one of its ancestors.
    pub fn match_safe_root(&self, path: &Path) -> Option<&SafeRoot> {
        self.safe_roots.iter().find(|root| root.contains(path))
    }

    /// Whether `path` may be destructively removed right now.
    pub fn is_removable(&self, path: &Path) -> bool {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => return false,
        };

        if self.is_protected(path) {
            return false;
        }

        if path == self.home {
            return false;
        }

        // Plain files are checked in place; anything else is checked at its resolved target.
        let target = if metadata.file_type().is_file() {
            path.to_path_buf()
        } else {
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        };

        if target == self.home {
            return false;
        }

        let target_ok = if target.is_dir() {
            can_write_and_traverse(&target)
        } else {
            can_write(&target)
        };
        if !target_ok {
            return false;
        }

        match target.parent() {
            Some(parent) if parent != target => can_write_and_traverse(parent),
            _ => true,
        }
    }

    /// True when a segment matches a protected identifier, or the path or one of its
    /// ancestors matches an exclude pattern.
    pub fn is_protected(&self, path: &Path) -> bool {
        let segment_hit = path
            .components()
            .any(|part| self.protected.is_match(part.as_os_str()));
        if segment_hit {
            return true;
        }
        self.exclude
            .as_ref()
            .is_some_and(|set| path.ancestors().any(|ancestor| set.is_match(ancestor)))
    }
}

#[cfg(unix)]
fn can_write(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};
    access(path, AccessFlags::W_OK).is_ok()
}

#[cfg(unix)]
fn can_write_and_traverse(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};
    access(path, AccessFlags::W_OK | AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn can_write(path: &Path) -> bool {
    fs::metadata(path).map(|m| !m.permissions().readonly()).unwrap_or(false)
}

#[cfg(not(unix))]
fn can_write_and_traverse(path: &Path) -> bool {
    can_write(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use assert_fs::prelude::*;

    fn gate_for(home: &Path, safe: &[&Path], trash: &[&Path]) -> SafetyGate {
        let mut settings = Settings::with_home(home).unwrap();
        settings.safe_roots = safe.iter().map(|p| p.to_path_buf()).collect();
        settings.trash_roots = trash.iter().map(|p| p.to_path_buf()).collect();
        SafetyGate::new(&settings)
    }

    #[test]
    fn home_directory_is_never_removable() {
        let home = assert_fs::TempDir::new().unwrap();
        let gate = gate_for(home.path(), &[home.path()], &[]);
        let canonical = fs::canonicalize(home.path()).unwrap();
        assert!(!gate.is_removable(&canonical));
        assert!(gate.match_safe_root(&canonical).is_some());
    }

    #[test]
    fn match_safe_root_prefers_configured_order() {
        let home = assert_fs::TempDir::new().unwrap();
        let outer = home.child("cache");
        let inner = home.child("cache/nested");
        inner.create_dir_all().unwrap();
        let gate = gate_for(home.path(), &[outer.path(), inner.path()], &[]);

        let candidate = fs::canonicalize(inner.path()).unwrap().join("file.bin");
        let matched = gate.match_safe_root(&candidate).unwrap();
        assert_eq!(matched.path, fs::canonicalize(outer.path()).unwrap());
    }

    #[test]
    fn paths_outside_safe_roots_do_not_match() {
        let home = assert_fs::TempDir::new().unwrap();
        home.child("cache").create_dir_all().unwrap();
        home.child("cachet").create_dir_all().unwrap();
        let gate = gate_for(home.path(), &[home.child("cache").path()], &[]);

        let sibling = fs::canonicalize(home.child("cachet").path()).unwrap();
        assert!(gate.match_safe_root(&sibling).is_none());
        assert!(gate.match_safe_root(Path::new("/")).is_none());
    }

    #[test]
    fn missing_and_protected_paths_are_refused() {
        let home = assert_fs::TempDir::new().unwrap();
        let bundle = home.child("cache/com.apple.Safari/data.db");
        bundle.write_str("x").unwrap();
        let plain = home.child("cache/plain.log");
        plain.write_str("x").unwrap();
        let gate = gate_for(home.path(), &[home.child("cache").path()], &[]);

        assert!(!gate.is_removable(&home.path().join("cache/gone")));
        assert!(!gate.is_removable(bundle.path()));
        assert!(gate.is_removable(plain.path()));
    }

    #[test]
    fn excluded_directory_protects_its_subtree() {
        let home = assert_fs::TempDir::new().unwrap();
        let state = home.child("cache/keep/sub/state.db");
        state.write_str("x").unwrap();
        let keep = fs::canonicalize(home.child("cache/keep").path()).unwrap();

        let mut settings = Settings::with_home(home.path()).unwrap();
        settings.safe_roots = vec![home.child("cache").path().to_path_buf()];
        settings.trash_roots = Vec::new();
        let exclude = Config { exclude: vec![keep.display().to_string()], ..Config::default() };
        settings.exclude = exclude.compile_excludes(home.path()).unwrap();
        let gate = SafetyGate::new(&settings);

        assert!(gate.is_protected(&keep));
        assert!(gate.is_protected(&keep.join("sub")));
        assert!(!gate.is_removable(&keep.join("sub/state.db")));
        assert!(!gate.is_protected(&keep.with_file_name("keeper")));
    }

    #[test]
    fn trash_exemption_survives_listing_in_both() {
        let home = assert_fs::TempDir::new().unwrap();
        home.child(".Trash").create_dir_all().unwrap();
        home.child("bin").create_dir_all().unwrap();
        let trash = home.path().join(".Trash");
        let bin = home.path().join("bin");

        let gate = gate_for(home.path(), &[trash.as_path(), bin.as_path()], &[bin.as_path()]);
        assert_eq!(gate.safe_roots().len(), 2);
        assert!(gate.safe_roots().iter().all(|root| root.trash));
    }

    #[test]
    fn missing_safe_roots_are_dropped() {
        let home = assert_fs::TempDir::new().unwrap();
        home.child(".Trash").create_dir_all().unwrap();
        let absent = home.path().join("absent");
        let trash = home.path().join(".Trash");
        let gate = gate_for(home.path(), &[absent.as_path()], &[trash.as_path()]);
        assert_eq!(gate.safe_roots().len(), 1);
        assert!(gate.safe_roots()[0].trash);
    }
}
