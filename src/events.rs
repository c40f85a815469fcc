//! Structured events emitted while scanning and cleaning, and the sinks that receive them.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Flow,
    Observe,
    Reflect,
    Error,
    Fix,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flow => "FLOW",
            Category::Observe => "OBSERVE",
            Category::Reflect => "REFLECT",
            Category::Error => "ERROR",
            Category::Fix => "FIX",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub category: Category,
    pub note: String,
    pub detail: String,
    pub timestamp: DateTime<Local>,
}

impl Event {
    pub fn new(category: Category, note: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { category, note: note.into(), detail: detail.into(), timestamp: Local::now() }
    }

    /// Render as a single milestone line: `[ts] Mode: CAT | Note: ... | Reflection: ...`.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "[{}] Mode: {} | Note: {}",
            self.timestamp.to_rfc3339(),
            self.category,
            self.note
        );
        if !self.detail.is_empty() {
            line.push_str(" | Reflection: ");
            line.push_str(&self.detail.replace('\n', " / "));
        }
        line
    }
}

/// Receiver for events. Implementations must not panic or propagate failures.
pub trait EventSink {
    fn record(&self, event: Event);

    fn flow(&self, note: &str, detail: &str) {
        self.record(Event::new(Category::Flow, note, detail));
    }

    fn observe(&self, note: &str, detail: &str) {
        self.record(Event::new(Category::Observe, note, detail));
    }

    fn error(&self, note: &str, detail: &str) {
        self.record(Event::new(Category::Error, note, detail));
    }
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn record(&self, event: Event) {
        (**self).record(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&self, event: Event) {
        (**self).record(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: Event) {}
}

/// Prints events to stderr when verbose output was requested.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    pub verbose: bool,
}

impl EventSink for ConsoleSink {
    fn record(&self, event: Event) {
        let always = matches!(event.category, Category::Error | Category::Fix);
        if self.verbose || always {
            eprintln!("[{}] {}", event.category, event.note);
            if self.verbose && !event.detail.is_empty() {
                for line in event.detail.lines() {
                    eprintln!("    {line}");
                }
            }
        }
    }
}

/// Appends one line per event to a text file, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct MilestoneLog {
    path: PathBuf,
}

impl MilestoneLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl EventSink for MilestoneLog {
    fn record(&self, event: Event) {
        if let Err(err) = self.append(&event.to_line()) {
            eprintln!("Unable to write {}: {}", self.path.display(), err);
        }
    }
}

/// Fans every event out to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn record(&self, event: Event) {
        self.0.record(event.clone());
        self.1.record(event);
    }
}

/// Keeps events in memory. Handy for callers that want to inspect a run afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn count(&self, category: Category) -> usize {
        self.events().iter().filter(|event| event.category == category).count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_line_includes_detail() {
        let event = Event::new(Category::Fix, "Auto-cleaned /tmp/x", "Freed 3.0M");
        let line = event.to_line();
        assert!(line.contains("Mode: FIX | Note: Auto-cleaned /tmp/x | Reflection: Freed 3.0M"));
    }

    #[test]
    fn milestone_log_appends() {
        let temp = tempfile::tempdir().unwrap();
        let log = MilestoneLog::new(temp.path().join("logs/milestones.txt"));
        log.flow("first", "");
        log.error("second", "boom");

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("Mode: ERROR | Note: second | Reflection: boom"));
    }

    #[test]
    fn tee_reaches_both_sinks() {
        let left = MemorySink::new();
        let right = MemorySink::new();
        Tee(&left, &right).observe("note", "detail");
        assert_eq!(left.count(Category::Observe), 1);
        assert_eq!(right.count(Category::Observe), 1);
    }
}
