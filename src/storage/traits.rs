//! Storage traits and error types
//!
//! This module defines the trait interface for ledger storage backends and
//! associated error types.

use crate::config::Operation;
use crate::storage::{LedgerEntry, RunCounts, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for ledger storage backend implementations
///
/// Every write must be durable when the method returns: the submission engine
/// relies on it to never resubmit a URL after a crash.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new run in the `running` state and returns its ID
    fn create_run(&mut self, config_hash: &str, operation: Operation) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets up to `limit` runs, newest first
    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Closes a run with its final status and counts
    fn finish_run(&mut self, run_id: i64, status: RunStatus, counts: RunCounts)
        -> StorageResult<()>;

    /// Marks runs left in the `running` state by a previous process as
    /// interrupted, returning how many were changed
    fn mark_stale_runs_interrupted(&mut self) -> StorageResult<usize>;

    // ===== Ledger =====

    /// Appends a submitted URL to the ledger
    ///
    /// Returns `false` without writing if the URL is already recorded for
    /// this operation.
    fn insert_submitted(
        &mut self,
        url: &str,
        operation: Operation,
        run_id: Option<i64>,
    ) -> StorageResult<bool>;

    /// Loads every ledger entry for an operation, in insertion order
    fn load_submitted(&self, operation: Operation) -> StorageResult<Vec<LedgerEntry>>;

    /// Counts ledger entries for an operation
    fn count_submitted(&self, operation: Operation) -> StorageResult<u64>;
}
