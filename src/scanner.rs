use std::path::{Path, PathBuf};

use crate::events::{Category, Event, EventSink};
use crate::model::UsageEntry;
use crate::probe::UsageProbe;

const MIB: u64 = 1024 * 1024;

/// Ranks the heaviest directories under a set of roots using a [`UsageProbe`].
pub struct UsageScanner<'a, P: UsageProbe + ?Sized> {
    probe: &'a P,
    sink: &'a dyn EventSink,
}

impl<'a, P: UsageProbe + ?Sized> UsageScanner<'a, P> {
    pub fn new(probe: &'a P, sink: &'a dyn EventSink) -> Self {
        Self { probe, sink }
    }

    /// Probe every root, merge, sort by size descending, then truncate to `limit`.
    ///
    /// Roots are scanned independently; overlapping roots yield repeated paths.
    pub fn scan(&self, roots: &[PathBuf], depth: usize, limit: usize) -> Vec<UsageEntry> {
        if roots.is_empty() {
            self.sink.observe(
                "No scan roots",
                "Skipping usage probe; no directories available to inspect.",
            );
            return Vec::new();
        }

        let mut entries = Vec::new();
        for root in roots {
            entries.extend(self.scan_root(root, depth));
        }

        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        entries.truncate(limit);
        entries
    }

    fn scan_root(&self, root: &Path, depth: usize) -> Vec<UsageEntry> {
        if !root.exists() {
            return Vec::new();
        }

        let output = match self.probe.measure(root, depth) {
            Ok(output) => output,
            Err(err) => {
                self.sink.error(
                    "Usage probe failed",
                    &format!("Root={}, depth={depth}: {err}", root.display()),
                );
                return Vec::new();
            }
        };

        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            self.sink.observe(&format!("Usage probe stderr for {}", root.display()), stderr);
        }

        output
            .stdout
            .lines()
            .filter_map(parse_usage_line)
            .map(|(size_bytes, path)| UsageEntry::new(path, size_bytes, root.to_path_buf()))
            .collect()
    }
}

/// Parse one `du -k` line (`<KiB><TAB><path>`) into a byte count and a path.
pub fn parse_usage_line(line: &str) -> Option<(u64, PathBuf)> {
    let line = line.trim();
    let (size, path) = match line.split_once('\t') {
        Some(parts) => parts,
        None => line.split_once(char::is_whitespace)?,
    };

    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let kib: u64 = size.trim().parse().ok()?;
    Some((kib.saturating_mul(1024), PathBuf::from(path)))
}

/// Summarize where the heaviest entries live and emit a single REFLECT event.
pub fn reflect(entries: &[UsageEntry], home: &Path, sink: &dyn EventSink) {
    let mut user = Vec::new();
    let mut apps = Vec::new();
    let mut system = Vec::new();

    for entry in entries {
        match classify(&entry.path, home) {
            Area::User => user.push(entry),
            Area::Applications => apps.push(entry),
            Area::System => system.push(entry),
            Area::Other => {}
        }
    }

    let summary = [
        summarize("User data", &user),
        summarize("Applications", &apps),
        summarize("System files", &system),
    ]
    .join("\n");
    sink.record(Event::new(Category::Reflect, "Disk hygiene interpretation", summary));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    User,
    Applications,
    System,
    Other,
}

fn classify(path: &Path, home: &Path) -> Area {
    let is_app_bundle = path
        .components()
        .any(|part| part.as_os_str().to_string_lossy().ends_with(".app"));
    if is_app_bundle || path.starts_with("/Applications") || path.starts_with("/opt") {
        return Area::Applications;
    }
    if ["/System", "/private", "/usr", "/var", "/etc"].iter().any(|p| path.starts_with(p)) {
        return Area::System;
    }
    let user_prefixes = ["/Users", "/home", "/Library"];
    if path.starts_with(home) || user_prefixes.iter().any(|p| path.starts_with(p)) {
        return Area::User;
    }
    Area::Other
}

fn summarize(label: &str, entries: &[&UsageEntry]) -> String {
    let top: Vec<String> = entries
        .iter()
        .filter(|entry| entry.size_bytes >= MIB)
        .take(3)
        .map(|entry| format!("{} → {}", entry.human_size, entry.path.display()))
        .collect();
    if top.is_empty() { format!("{label}: none") } else { format!("{label}: {}", top.join(", ")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::events::NullSink;
    use crate::probe::ProbeOutput;

    #[test]
    fn parses_tab_and_space_separated_lines() {
        assert_eq!(parse_usage_line("12\t/tmp/a b"), Some((12 * 1024, PathBuf::from("/tmp/a b"))));
        assert_eq!(parse_usage_line("  7   /var/log"), Some((7 * 1024, PathBuf::from("/var/log"))));
    }

    #[test]
    fn rejects_noise() {
        assert_eq!(parse_usage_line("du: cannot read directory '/x': Permission denied"), None);
        assert_eq!(parse_usage_line(""), None);
        assert_eq!(parse_usage_line("42"), None);
        assert_eq!(parse_usage_line("-5\t/tmp"), None);
    }

    #[test]
    fn merges_roots_and_ranks_by_size() {
        let probe = |root: &Path, _depth: usize| -> Result<ProbeOutput, ProbeError> {
            let stdout = if root.ends_with("a") { "4\t/a\n1\t/a/x\n" } else { "9\t/b\n" };
            Ok(ProbeOutput { stdout: stdout.to_string(), stderr: String::new() })
        };
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let entries = UsageScanner::new(&probe, &NullSink).scan(&[a.clone(), b.clone()], 1, 2);
        let paths: Vec<&Path> = entries.iter().map(|entry| entry.path.as_path()).collect();
        assert_eq!(paths, [Path::new("/b"), Path::new("/a")]);
        assert_eq!(entries[0].root, b);
        assert_eq!(entries[1].root, a);
    }

    #[test]
    fn classifies_common_locations() {
        let home = Path::new("/Users/demo");
        assert_eq!(classify(Path::new("/Users/demo/Downloads"), home), Area::User);
        let bundle = Path::new("/Applications/Code.app/Contents");
        assert_eq!(classify(bundle, home), Area::Applications);
        assert_eq!(classify(Path::new("/private/var/vm"), home), Area::System);
        assert_eq!(classify(Path::new("/srv/data"), home), Area::Other);
    }
}
