use crate::commands::{
    CommonOptions, load_settings, open_sink, print_actions, print_entries, spinner,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::events::EventSink;
use crate::hygiene::{DiskHygiene, ScanRequest};
use crate::model::ScanReport;
use crate::path::display_path;
use crate::probe::{DfProbe, DuProbe, WalkProbe};
use crate::summary::append_summary;

pub struct ScanOptions {
    pub common: CommonOptions,
    pub auto_cleanup: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub fn execute_scan(options: ScanOptions) -> Result<ScanReport, AppError> {
    let settings = load_settings(&options.common)?;
    let summary_log = settings.summary_log.clone();
    let sink = open_sink(&settings, options.common.verbose && !options.json);

    let request = ScanRequest {
        depth: options.common.depth,
        limit: options.common.limit,
        auto_cleanup: options.auto_cleanup,
        roots: options.common.roots(),
        dry_run: options.dry_run,
    };

    let progress = spinner(options.json, "Measuring disk usage...");
    let report = run_scan(settings, options.common.walk, sink.as_ref(), &request);
    progress.finish_and_clear();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, options.dry_run);
    }

    if let Some(path) = summary_log
        && let Err(err) = append_summary(&path, &report)
    {
        sink.error("Failed to write summary", &err.to_string());
    }

    Ok(report)
}

/// Scan with the host `du`, or with the in-process walker when `walk` is set.
pub(crate) fn run_scan(
    settings: Settings,
    walk: bool,
    sink: &dyn EventSink,
    request: &ScanRequest,
) -> ScanReport {
    let space = DfProbe { timeout: settings.df_timeout };
    if walk {
        DiskHygiene::with_probes(settings, space, WalkProbe, sink).scan(request)
    } else {
        let usage = DuProbe { timeout: settings.du_timeout };
        DiskHygiene::with_probes(settings, space, usage, sink).scan(request)
    }
}

fn print_report(report: &ScanReport, dry_run: bool) {
    println!("Scan results:");
    if report.scan_roots.is_empty() {
        println!("No scan roots exist; nothing to inspect.");
    }
    for root in &report.scan_roots {
        println!("- {}", display_path(root));
    }

    println!("\nTop directories:");
    print_entries(&report.usage_entries);

    if report.cleanup_actions.is_empty() {
        println!("\nNo cleanup actions.");
    } else {
        let heading = if dry_run { "Cleanup plan (dry run):" } else { "Cleanup actions:" };
        println!("\n{heading}");
        print_actions(&report.cleanup_actions, report.total_freed());
    }
}
