//! Library entry point for the hygiene CLI.

pub mod cleanup;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod hygiene;
pub mod model;
pub mod path;
pub mod probe;
pub mod safety;
pub mod scanner;
pub mod size;
pub mod summary;

pub use cleanup::{CleanupEngine, Decision};
pub use config::{Config, Settings};
pub use hygiene::{DiskHygiene, ScanRequest};
pub use model::{CleanupAction, CleanupReport, SafeRoot, ScanReport, SkipReason, UsageEntry};
pub use safety::SafetyGate;
