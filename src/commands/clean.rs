use dialoguer::Confirm;

use crate::commands::scan::run_scan;
use crate::commands::{CommonOptions, load_settings, open_sink, print_actions, spinner};
use crate::error::AppError;
use crate::format::humanize_bytes;
use crate::hygiene::{DiskHygiene, ScanRequest};
use crate::model::{CleanupReport, SkipReason};
use crate::path::display_path;

pub struct CleanOptions {
    pub common: CommonOptions,
    pub assume_yes: bool,
    pub dry_run: bool,
}

pub fn execute_clean(options: CleanOptions) -> Result<CleanupReport, AppError> {
    let settings = load_settings(&options.common)?;
    let sink = open_sink(&settings, options.common.verbose);

    let request = ScanRequest {
        depth: options.common.depth,
        limit: options.common.limit,
        auto_cleanup: false,
        roots: options.common.roots(),
        dry_run: false,
    };

    let progress = spinner(false, "Measuring disk usage...");
    let report = run_scan(settings.clone(), options.common.walk, sink.as_ref(), &request);
    progress.finish_and_clear();

    let hygiene = DiskHygiene::new(settings, sink.as_ref());
    let plan = hygiene.cleanup_with(&report.usage_entries, true);

    if plan.actions.is_empty() {
        println!("Nothing to clean. No candidate passed the safety and size checks.");
        print_skip_summary(&plan);
        return Ok(plan);
    }

    println!("Cleanup plan:");
    print_actions(&plan.actions, plan.total_freed());
    print_skip_summary(&plan);

    if options.dry_run {
        return Ok(plan);
    }

    if !options.assume_yes {
        match confirm(plan.total_freed()) {
            Ok(()) => {}
            Err(AppError::Cancelled) => {
                println!("Aborted. No files were deleted.");
                return Ok(plan);
            }
            Err(err) => return Err(err),
        }
    }

    let outcome = hygiene.cleanup(&report.usage_entries);
    println!("Cleanup actions:");
    print_actions(&outcome.actions, outcome.total_freed());
    for failure in &outcome.failures {
        println!("  ! {}: {}", display_path(&failure.path), failure.error);
    }
    Ok(outcome)
}

fn confirm(total: u64) -> Result<(), AppError> {
    let proceed = Confirm::new()
        .with_prompt(format!("About to delete about {}. Proceed?", humanize_bytes(total)))
        .default(false)
        .interact()?;
    if proceed { Ok(()) } else { Err(AppError::Cancelled) }
}

fn print_skip_summary(report: &CleanupReport) {
    let reasons = [
        SkipReason::BelowThreshold,
        SkipReason::Protected,
        SkipReason::OutsideSafeRoots,
        SkipReason::PermissionDenied,
    ];
    for reason in reasons {
        let count = report.skipped_for(reason).count();
        if count > 0 {
            println!("Skipped {count} candidate(s): {reason}");
        }
    }
}
