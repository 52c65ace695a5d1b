//! Statistics from the ledger database
//!
//! Backs the `--stats` mode: ledger size per operation, the most recent
//! runs with their final status, and the latest URLs recorded for the
//! configured operation.

use crate::config::Operation;
use crate::storage::{LedgerEntry, RunRecord, Storage, StorageResult};

/// Ledger and run history summary
#[derive(Debug, Clone)]
pub struct LedgerStatistics {
    /// Submitted URL count per operation
    pub submitted_by_operation: Vec<(Operation, u64)>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

impl LedgerStatistics {
    pub fn total_submitted(&self) -> u64 {
        self.submitted_by_operation.iter().map(|(_, n)| n).sum()
    }
}

/// Loads statistics from storage, keeping up to `recent` runs
pub fn load_statistics(storage: &dyn Storage, recent: usize) -> StorageResult<LedgerStatistics> {
    let mut submitted_by_operation = Vec::new();
    for operation in [Operation::Register, Operation::Delete] {
        submitted_by_operation.push((operation, storage.count_submitted(operation)?));
    }

    let recent_runs = storage.get_recent_runs(recent)?;

    Ok(LedgerStatistics {
        submitted_by_operation,
        recent_runs,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Ledger Statistics ===\n");

    println!("Submitted URLs:");
    for (operation, count) in &stats.submitted_by_operation {
        println!("  {}: {}", operation.to_db_string(), count);
    }
    println!("  total: {}", stats.total_submitted());
    println!();

    if stats.recent_runs.is_empty() {
        println!("No runs recorded yet");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.recent_runs {
        println!(
            "  #{} {} {} [{}] submitted={} skipped={} failed={}",
            run.id,
            run.started_at,
            run.operation.to_db_string(),
            run.status.to_db_string(),
            run.counts.submitted,
            run.counts.skipped,
            run.counts.failed
        );
    }
}

/// The last `limit` entries of a ledger listing, oldest first
pub fn latest_entries(entries: &[LedgerEntry], limit: usize) -> &[LedgerEntry] {
    &entries[entries.len().saturating_sub(limit)..]
}

/// Prints the last `limit` recorded URLs
pub fn print_latest_entries(entries: &[LedgerEntry], limit: usize) {
    let latest = latest_entries(entries, limit);
    if latest.is_empty() {
        return;
    }

    println!();
    println!("Latest submissions:");
    for entry in latest {
        println!("  {} {}", entry.submitted_at, entry.url);
    }
}
