//! Cleanup engine: walks ranked usage entries and reclaims space inside safe roots.
//!
//! Per candidate, in ranked order:
//! 1. Normalize; skip duplicates already handled in this run and paths that are gone.
//! 2. Require a matching safe root.
//! 3. Re-check [`SafetyGate::is_removable`] against live filesystem state.
//! 4. Apply the size threshold (trash roots are exempt).
//! 5. Clear the contents of a safe root itself, or remove anything below it. Protected and
//!    excluded entries stay, along with the directories that lead to them.
//!
//! Failures never abort the batch; each one is recorded and the next candidate is tried.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::RemovalError;
use crate::events::{Category, Event, EventSink};
use crate::model::{
    CleanupAction, CleanupReport, FailedCandidate, SafeRoot, SkipReason, SkippedCandidate,
    UsageEntry,
};
use crate::path::normalize_path;
use crate::safety::SafetyGate;
use crate::size::path_size;

/// Outcome for a single candidate.
#[derive(Debug)]
pub enum Decision {
    Removed(CleanupAction),
    Skipped(SkipReason),
    Failed(RemovalError),
}

pub struct CleanupEngine<'a> {
    gate: &'a SafetyGate,
    sink: &'a dyn EventSink,
    min_cleanup_bytes: u64,
    dry_run: bool,
}

impl<'a> CleanupEngine<'a> {
    pub fn new(gate: &'a SafetyGate, min_cleanup_bytes: u64, sink: &'a dyn EventSink) -> Self {
        Self { gate, sink, min_cleanup_bytes, dry_run: false }
    }

    /// Evaluate every gate but leave the filesystem untouched.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Remove what is allowed and return the committed actions.
    pub fn cleanup(&self, entries: &[UsageEntry]) -> Vec<CleanupAction> {
        self.run(entries).actions
    }

    pub fn run(&self, entries: &[UsageEntry]) -> CleanupReport {
        let mut report = CleanupReport { dry_run: self.dry_run, ..CleanupReport::default() };
        if self.gate.safe_roots().is_empty() {
            self.sink.observe("No safe cleanup roots", "Cleanup skipped; nothing is authorized.");
            return report;
        }

        let mut processed: HashSet<PathBuf> = HashSet::new();
        for entry in entries {
            let candidate = normalize_path(&entry.path, self.gate.home());
            // Planned paths stay on disk during a dry run; skip their descendants.
            let planned = self.dry_run
                && report.actions.iter().any(|action| candidate.starts_with(&action.path));
            let decision = if !planned && processed.insert(candidate.clone()) {
                self.process(&candidate, entry.size_bytes)
            } else {
                Decision::Skipped(SkipReason::AlreadyProcessed)
            };

            match decision {
                Decision::Removed(action) => report.actions.push(action),
                Decision::Skipped(reason) => {
                    report.skipped.push(SkippedCandidate { path: candidate, reason })
                }
                Decision::Failed(error) => report
                    .failures
                    .push(FailedCandidate { path: candidate, error: error.to_string() }),
            }
        }

        report
    }

    /// Run the full gate sequence for one normalized candidate.
    pub fn process(&self, candidate: &Path, recorded_size: u64) -> Decision {
        if fs::symlink_metadata(candidate).is_err() {
            return Decision::Skipped(SkipReason::Missing);
        }

        let Some(safe_root) = self.gate.match_safe_root(candidate) else {
            return Decision::Skipped(SkipReason::OutsideSafeRoots);
        };

        let estimated = if recorded_size > 0 { recorded_size } else { path_size(candidate) };

        if !self.gate.is_removable(candidate) {
            self.sink.observe(
                &format!("Skipped {}", candidate.display()),
                SkipReason::Protected.describe(),
            );
            return Decision::Skipped(SkipReason::Protected);
        }

        if estimated < self.min_cleanup_bytes && !safe_root.trash {
            return Decision::Skipped(SkipReason::BelowThreshold);
        }

        let removal = if candidate == safe_root.path {
            self.clear_contents(candidate)
        } else {
            self.remove_path(candidate)
        };

        match removal {
            Ok(0) => Decision::Skipped(SkipReason::NothingFreed),
            Ok(freed) => Decision::Removed(self.commit(candidate, freed, safe_root)),
            Err(err) if err.is_permission_denied() => {
                self.sink.observe(
                    &format!("Skipped {}", candidate.display()),
                    &format!("Permission denied: {err}"),
                );
                Decision::Skipped(SkipReason::PermissionDenied)
            }
            Err(err) => {
                let note = format!("Failed to prune {}", candidate.display());
                self.sink.error(&note, &err.to_string());
                Decision::Failed(err)
            }
        }
    }

    fn commit(&self, candidate: &Path, freed: u64, safe_root: &SafeRoot) -> CleanupAction {
        let action = CleanupAction::new(candidate.to_path_buf(), freed, safe_root.path.clone());
        let verb = if self.dry_run { "Would clean" } else { "Auto-cleaned" };
        self.sink.record(Event::new(
            Category::Fix,
            format!("{verb} {}", candidate.display()),
            format!(
                "Freed approximately {} (under {})",
                action.human_freed,
                safe_root.path.display()
            ),
        ));
        action
    }

    /// Remove every immediate child of `directory`, keeping the directory itself.
    fn clear_contents(&self, directory: &Path) -> Result<u64, RemovalError> {
        let children =
            fs::read_dir(directory).map_err(|err| RemovalError::from_io(directory.into(), err))?;

        let mut total = 0u64;
        for child in children.filter_map(Result::ok) {
            let path = child.path();
            match self.remove_path(&path) {
                Ok(freed) => total = total.saturating_add(freed),
                Err(err) if err.is_permission_denied() => self.sink.observe(
                    &format!("Skipped {}", path.display()),
                    &format!("Permission denied: {err}"),
                ),
                Err(err) => {
                    let note = format!("Failed to remove {}", path.display());
                    self.sink.error(&note, &err.to_string());
                }
            }
        }
        Ok(total)
    }

    /// Remove a file, symlink or directory tree after re-checking the gate.
    /// Returns the bytes actually removed.
    fn remove_path(&self, path: &Path) -> Result<u64, RemovalError> {
        if !self.gate.is_removable(path) {
            return Err(RemovalError::PermissionDenied(path.to_path_buf()));
        }

        let metadata =
            fs::symlink_metadata(path).map_err(|err| RemovalError::from_io(path.into(), err))?;
        if metadata.is_dir() {
            return self.prune_tree(path);
        }

        if !self.dry_run {
            fs::remove_file(path).map_err(|err| RemovalError::from_io(path.into(), err))?;
        }
        Ok(metadata.len())
    }

    /// Remove `root` deepest-first, leaving protected entries and every directory that still
    /// holds one. Stops at the first entry that cannot be read or removed.
    fn prune_tree(&self, root: &Path) -> Result<u64, RemovalError> {
        let mut kept: Vec<PathBuf> = Vec::new();
        let mut freed = 0u64;

        let walker = WalkDir::new(root).follow_links(false).contents_first(true);
        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(root).to_path_buf();
                RemovalError::from_io(path, io::Error::from(err))
            })?;
            let path = entry.path();

            if kept.iter().any(|kept| kept.starts_with(path)) {
                continue;
            }
            if self.gate.is_protected(path) {
                kept.push(path.to_path_buf());
                continue;
            }

            if entry.file_type().is_dir() {
                if !self.dry_run {
                    fs::remove_dir(path).map_err(|err| RemovalError::from_io(path.into(), err))?;
                }
            } else {
                let size = entry.metadata().map(|metadata| metadata.len()).unwrap_or(0);
                if !self.dry_run {
                    fs::remove_file(path).map_err(|err| RemovalError::from_io(path.into(), err))?;
                }
                freed = freed.saturating_add(size);
            }
        }

        if !kept.is_empty() {
            self.sink.observe(
                &format!("Kept {} protected path(s) under {}", kept.len(), root.display()),
                SkipReason::Protected.describe(),
            );
        }
        Ok(freed)
    }
}
