//! Resume ledger: the durable set of URLs already submitted
//!
//! The full ledger for the run's operation is loaded into a `HashSet` when the
//! ledger is opened, so membership checks never touch the database. Writes go
//! to storage first and only then to the set, so a failed write never makes a
//! URL look submitted.

use crate::config::Operation;
use crate::storage::{
    LedgerEntry, RunCounts, RunStatus, SqliteStorage, Storage, StorageResult,
};
use std::collections::HashSet;
use std::path::Path;

/// Durable, append-only record of submitted URLs for one operation
pub struct ResumeLedger {
    storage: Box<dyn Storage>,
    operation: Operation,
    submitted: HashSet<String>,
    run_id: Option<i64>,
}

impl ResumeLedger {
    /// Opens the SQLite ledger at `path` for `operation`
    pub fn open(path: &Path, operation: Operation) -> StorageResult<Self> {
        let storage = SqliteStorage::new(path)?;
        Self::with_storage(Box::new(storage), operation)
    }

    /// Builds a ledger over any storage backend, loading existing entries
    pub fn with_storage(storage: Box<dyn Storage>, operation: Operation) -> StorageResult<Self> {
        let submitted: HashSet<String> = storage
            .load_submitted(operation)?
            .into_iter()
            .map(|entry| entry.url)
            .collect();

        tracing::debug!(
            "Loaded {} ledger entries for {}",
            submitted.len(),
            operation.to_db_string()
        );

        Ok(Self {
            storage,
            operation,
            submitted,
            run_id: None,
        })
    }

    /// Operation this ledger tracks
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns true if `url` was already submitted successfully
    pub fn contains(&self, url: &str) -> bool {
        self.submitted.contains(url)
    }

    /// Durably records a successful submission of `url`
    ///
    /// The database commit has completed when this returns `Ok`. Recording a
    /// URL that is already present is a no-op.
    pub fn record(&mut self, url: &str) -> StorageResult<()> {
        if self.submitted.contains(url) {
            return Ok(());
        }
        self.storage
            .insert_submitted(url, self.operation, self.run_id)?;
        self.submitted.insert(url.to_string());
        Ok(())
    }

    /// Number of URLs in the ledger
    pub fn len(&self) -> usize {
        self.submitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty()
    }

    /// All entries, in the order they were recorded
    pub fn entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        self.storage.load_submitted(self.operation)
    }

    // ===== Run tracking =====

    /// Starts a run record; later `record` calls are attributed to it
    ///
    /// Runs a previous process left in the `running` state are marked
    /// interrupted first.
    pub fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let stale = self.storage.mark_stale_runs_interrupted()?;
        if stale > 0 {
            tracing::warn!("Marked {} unfinished previous run(s) as interrupted", stale);
        }

        let run_id = self.storage.create_run(config_hash, self.operation)?;
        self.run_id = Some(run_id);
        tracing::debug!("Started run {}", run_id);
        Ok(run_id)
    }

    /// Closes the current run record, if one was started
    pub fn finish_run(&mut self, status: RunStatus, counts: RunCounts) -> StorageResult<()> {
        if let Some(run_id) = self.run_id.take() {
            self.storage.finish_run(run_id, status, counts)?;
            tracing::debug!("Finished run {} as {}", run_id, status.to_db_string());
        }
        Ok(())
    }
}
