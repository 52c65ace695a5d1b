//! Storage module for persisting submission progress
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The append-only ledger of submitted URLs
//! - Run tracking (start, final status, counts) for the run history

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::Operation;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A URL recorded in the ledger after a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub url: String,
    pub operation: Operation,
    pub submitted_at: String,
    pub run_id: Option<i64>,
}

/// Represents a submission run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub operation: Operation,
    pub status: RunStatus,
    pub counts: RunCounts,
}

/// Per-run outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub submitted: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Status of a submission run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Run in progress (or abandoned without finishing)
    Running,
    /// Every URL after the offset was processed
    Completed,
    /// Stopped at the configured daily limit
    LimitReached,
    /// Aborted because the provider's daily quota is exhausted
    QuotaExceeded,
    /// Aborted by a fatal error
    Failed,
    /// Found still `running` by a later run
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::LimitReached => "limit_reached",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Failed => "failed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "limit_reached" => Some(Self::LimitReached),
            "quota_exceeded" => Some(Self::QuotaExceeded),
            "failed" => Some(Self::Failed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
