use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::format::humanize_bytes;

/// One ranked `(path, size)` observation from a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub human_size: String,
    pub root: PathBuf,
}

impl UsageEntry {
    pub fn new(path: PathBuf, size_bytes: u64, root: PathBuf) -> Self {
        UsageEntry { path, size_bytes, human_size: humanize_bytes(size_bytes), root }
    }
}

/// A directory under which destructive removal is authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeRoot {
    pub path: PathBuf,
    /// Trash roots are exempt from the minimum cleanup size.
    pub trash: bool,
}

impl SafeRoot {
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// Record of an executed, irreversible removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupAction {
    pub path: PathBuf,
    pub bytes_freed: u64,
    pub human_freed: String,
    pub safe_root: PathBuf,
}

impl CleanupAction {
    pub fn new(path: PathBuf, bytes_freed: u64, safe_root: PathBuf) -> Self {
        CleanupAction { path, bytes_freed, human_freed: humanize_bytes(bytes_freed), safe_root }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Missing,
    AlreadyProcessed,
    OutsideSafeRoots,
    Protected,
    BelowThreshold,
    PermissionDenied,
    NothingFreed,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::Missing => "path no longer exists",
            SkipReason::AlreadyProcessed => "already handled in this run",
            SkipReason::OutsideSafeRoots => "outside every safe cleanup root",
            SkipReason::Protected => "path is protected or lacks delete permissions",
            SkipReason::BelowThreshold => "below the minimum cleanup size",
            SkipReason::PermissionDenied => "permission denied during removal",
            SkipReason::NothingFreed => "nothing was freed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCandidate {
    pub path: PathBuf,
    pub error: String,
}

/// Everything a cleanup pass decided, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub actions: Vec<CleanupAction>,
    pub skipped: Vec<SkippedCandidate>,
    pub failures: Vec<FailedCandidate>,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn total_freed(&self) -> u64 {
        self.actions.iter().map(|action| action.bytes_freed).sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedCandidate> {
        self.skipped.iter().filter(move |skip| skip.reason == reason)
    }
}

/// Result of one scan invocation, handed to the caller once.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub timestamp: DateTime<Local>,
    /// Raw `df` text, or an inline error message when the probe failed.
    pub disk_free: String,
    pub usage_entries: Vec<UsageEntry>,
    pub scan_roots: Vec<PathBuf>,
    pub cleanup_actions: Vec<CleanupAction>,
}

impl ScanReport {
    pub fn total_freed(&self) -> u64 {
        self.cleanup_actions.iter().map(|action| action.bytes_freed).sum()
    }
}
