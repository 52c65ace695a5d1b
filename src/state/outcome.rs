//! Per-URL submission outcomes
//!
//! Exactly one outcome is produced for each URL the engine looks at in a run.

use chrono::{DateTime, Utc};
use std::fmt;

/// Why a URL could not be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Retryable failures (timeouts, 5xx, rate limiting) outlasted the retry budget
    RetriesExhausted,
    /// The service rejected the request (400, 403, 404, ...)
    Rejected,
    /// The credential was refused even after a refresh
    Unauthorized,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Result of processing one URL
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Accepted by the service; the URL is now in the ledger
    Success {
        /// Notification time reported by the service
        notify_time: DateTime<Utc>,
        /// Attempts it took, including the successful one
        attempts: u32,
    },

    /// Already in the ledger; no request was made
    Skipped,

    /// Given up on; will be tried again by a later run
    Failed {
        kind: FailureKind,
        attempts: u32,
        message: String,
    },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Remote attempts made for this URL
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
            Self::Skipped => 0,
        }
    }
}
