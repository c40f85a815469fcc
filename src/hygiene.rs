use std::path::PathBuf;

use chrono::Local;

use crate::cleanup::CleanupEngine;
use crate::config::Settings;
use crate::events::{Category, Event, EventSink};
use crate::model::{CleanupReport, ScanReport, UsageEntry};
use crate::path::resolve_existing;
use crate::probe::{DfProbe, DuProbe, SpaceProbe, UsageProbe};
use crate::safety::SafetyGate;
use crate::scanner::{UsageScanner, reflect};

const DF_PREVIEW_LINES: usize = 5;

/// Parameters for one scan. `None` falls back to the configured default.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub depth: Option<usize>,
    pub limit: Option<usize>,
    pub auto_cleanup: bool,
    pub roots: Option<Vec<PathBuf>>,
    pub dry_run: bool,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self { depth: None, limit: None, auto_cleanup: true, roots: None, dry_run: false }
    }
}

/// Scan-and-report plus cleanup over one host, wired to its probes and event sink.
pub struct DiskHygiene<'a, S: SpaceProbe = DfProbe, U: UsageProbe = DuProbe> {
    settings: Settings,
    space: S,
    usage: U,
    sink: &'a dyn EventSink,
}

impl<'a> DiskHygiene<'a> {
    /// Use the host `df` and `du` with the configured timeouts.
    pub fn new(settings: Settings, sink: &'a dyn EventSink) -> Self {
        let space = DfProbe { timeout: settings.df_timeout };
        let usage = DuProbe { timeout: settings.du_timeout };
        DiskHygiene { settings, space, usage, sink }
    }
}

impl<'a, S: SpaceProbe, U: UsageProbe> DiskHygiene<'a, S, U> {
    pub fn with_probes(settings: Settings, space: S, usage: U, sink: &'a dyn EventSink) -> Self {
        DiskHygiene { settings, space, usage, sink }
    }

    pub fn scan(&self, request: &ScanRequest) -> ScanReport {
        let timestamp = Local::now();
        let depth = request.depth.unwrap_or(self.settings.depth);
        let limit = request.limit.unwrap_or(self.settings.limit);
        let requested = request.roots.as_ref().unwrap_or(&self.settings.scan_roots);
        let roots = resolve_existing(requested, &self.settings.home);

        let listed: Vec<String> = roots.iter().map(|root| root.display().to_string()).collect();
        self.sink.flow(
            "Disk hygiene scan started",
            &format!("depth={depth}, limit={limit}, roots=[{}]", listed.join(", ")),
        );

        let disk_free = self.disk_free();
        let preview: Vec<&str> = disk_free.lines().take(DF_PREVIEW_LINES).collect();
        let preview = if preview.is_empty() {
            "df returned no output".to_string()
        } else {
            preview.join("\n")
        };
        self.sink.flow("df output preview", &preview);

        let scanner = UsageScanner::new(&self.usage, self.sink);
        let usage_entries = scanner.scan(&roots, depth, limit);
        reflect(&usage_entries, &self.settings.home, self.sink);

        let cleanup_actions = if request.auto_cleanup {
            self.cleanup_with(&usage_entries, request.dry_run).actions
        } else {
            Vec::new()
        };

        self.sink.record(Event::new(
            Category::Reflect,
            "Disk hygiene summary",
            format!(
                "Scan complete: {} usage entries, {} cleanup actions.",
                usage_entries.len(),
                cleanup_actions.len()
            ),
        ));

        ScanReport { timestamp, disk_free, usage_entries, scan_roots: roots, cleanup_actions }
    }

    /// Clean up independently of a scan, e.g. from a previously produced report.
    pub fn cleanup(&self, entries: &[UsageEntry]) -> CleanupReport {
        self.cleanup_with(entries, false)
    }

    pub fn cleanup_with(&self, entries: &[UsageEntry], dry_run: bool) -> CleanupReport {
        // Safe roots are re-resolved against the live tree on every run.
        let gate = SafetyGate::new(&self.settings);
        CleanupEngine::new(&gate, self.settings.min_cleanup_bytes, self.sink)
            .dry_run(dry_run)
            .run(entries)
    }

    fn disk_free(&self) -> String {
        match self.space.disk_free() {
            Ok(text) => text,
            Err(err) => {
                self.sink.error("df command failed", &err.to_string());
                format!("Error running df: {err}")
            }
        }
    }
}
