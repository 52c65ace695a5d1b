//! Output module for textual run reports
//!
//! This module handles:
//! - Printing the summary of a finished run
//! - Planning and printing a dry run (what would be submitted)
//! - Ledger statistics for `--stats`

pub mod stats;

pub use stats::{
    latest_entries, load_statistics, print_latest_entries, print_statistics, LedgerStatistics,
};

use crate::config::RunConfig;
use crate::engine::{RunSummary, StopReason};
use crate::sitemap::SitemapUrl;
use crate::state::{ResumeLedger, SubmissionOutcome};

/// What a run would do with the current sitemap and ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunPlan {
    /// URLs in the sitemap
    pub total: usize,
    /// URLs dropped by the start offset
    pub offset_skipped: usize,
    /// URLs already in the ledger
    pub already_submitted: usize,
    /// URLs a run would submit, in order, up to the daily limit
    pub to_submit: Vec<String>,
    /// URLs left for later runs because of the daily limit
    pub deferred: usize,
}

/// Applies the start offset, ledger and daily limit to `urls` without submitting
pub fn plan_dry_run(urls: &[SitemapUrl], run: &RunConfig, ledger: &ResumeLedger) -> DryRunPlan {
    let mut plan = DryRunPlan {
        total: urls.len(),
        offset_skipped: run.start_offset.min(urls.len()),
        ..DryRunPlan::default()
    };

    for url in urls.iter().skip(run.start_offset) {
        if ledger.contains(url.as_str()) {
            plan.already_submitted += 1;
        } else if plan.to_submit.len() < run.daily_limit as usize {
            plan.to_submit.push(url.as_str().to_string());
        } else {
            plan.deferred += 1;
        }
    }

    plan
}

/// Prints a dry run plan to stdout
pub fn print_dry_run(plan: &DryRunPlan) {
    println!("=== Dry Run ===\n");
    println!("  URLs in sitemap: {}", plan.total);
    println!("  Skipped by start offset: {}", plan.offset_skipped);
    println!("  Already submitted: {}", plan.already_submitted);
    println!("  Would submit now: {}", plan.to_submit.len());
    println!("  Deferred by daily limit: {}", plan.deferred);

    if !plan.to_submit.is_empty() {
        println!();
        for (i, url) in plan.to_submit.iter().enumerate() {
            println!("  {:>4}. {}", i + 1, url);
        }
    }
}

/// Prints the summary of a finished run to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Run Summary ===\n");
    println!("  Submitted: {}", summary.submitted);
    println!("  Skipped (already submitted): {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
    println!("  Remote calls: {}", summary.attempts);

    match summary.stop_reason {
        StopReason::Exhausted => println!("  Stopped: end of sitemap"),
        StopReason::DailyLimit => {
            println!("  Stopped: daily limit reached, the next run continues from here")
        }
    }

    let failures: Vec<_> = summary
        .outcomes
        .iter()
        .filter_map(|(url, outcome)| match outcome {
            SubmissionOutcome::Failed { kind, message, .. } => Some((url, kind, message)),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        println!("\nFailed URLs ({}):", failures.len());
        for (url, kind, message) in failures {
            println!("  - {} ({}): {}", url, kind, message);
        }
    }
}
