use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::model::ScanReport;

/// Render `report` in the append-only text layout used by the summary log.
pub fn render_summary(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n[SUMMARY] {}", report.timestamp.to_rfc3339());

    out.push_str("Scanned Roots:\n");
    for root in &report.scan_roots {
        let _ = writeln!(out, "- {}", root.display());
    }

    out.push_str("\nDisk Usage (df):\n");
    let disk_free = if report.disk_free.is_empty() { "Unavailable" } else { &report.disk_free };
    let _ = writeln!(out, "{disk_free}\n");

    out.push_str("Top Directories (du):\n");
    for entry in &report.usage_entries {
        let _ = writeln!(out, "{}  {}", entry.human_size, entry.path.display());
    }

    out.push_str("\nCleanup Actions:\n");
    if report.cleanup_actions.is_empty() {
        out.push_str("- None\n");
    }
    for action in &report.cleanup_actions {
        let _ = writeln!(
            out,
            "- Freed {} from {} (safe root: {})",
            action.human_freed,
            action.path.display(),
            action.safe_root.display()
        );
    }
    out
}

/// Append the rendered summary to `path`, creating parent directories as needed.
pub fn append_summary(path: &Path, report: &ScanReport) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(render_summary(report).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CleanupAction, UsageEntry};
    use chrono::Local;
    use std::path::PathBuf;

    fn report(actions: Vec<CleanupAction>) -> ScanReport {
        ScanReport {
            timestamp: Local::now(),
            disk_free: "Filesystem Size Used Avail".into(),
            usage_entries: vec![UsageEntry::new(
                "/tmp/cache".into(),
                3 * 1024 * 1024,
                "/tmp".into(),
            )],
            scan_roots: vec![PathBuf::from("/tmp")],
            cleanup_actions: actions,
        }
    }

    #[test]
    fn summary_lists_entries_and_placeholder_actions() {
        let text = render_summary(&report(Vec::new()));
        assert!(text.contains("[SUMMARY]"));
        assert!(text.contains("- /tmp\n"));
        assert!(text.contains("3.0M  /tmp/cache"));
        assert!(text.contains("Cleanup Actions:\n- None"));
    }

    #[test]
    fn summary_lists_cleanup_actions() {
        let action = CleanupAction::new("/tmp/cache".into(), 1024, "/tmp/cache".into());
        let text = render_summary(&report(vec![action]));
        assert!(text.contains("- Freed 1.0K from /tmp/cache (safe root: /tmp/cache)"));
    }

    #[test]
    fn append_summary_accumulates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logs/workspace_log.txt");
        append_summary(&path, &report(Vec::new())).unwrap();
        append_summary(&path, &report(Vec::new())).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("[SUMMARY]").count(), 2);
    }
}
