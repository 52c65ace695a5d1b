//! Submission engine module
//!
//! This module contains the submission pipeline, including:
//! - The run coordinator that walks the work queue
//! - The remote indexing client and its failure classification
//! - Request pacing and the retry/backoff policy

mod client;
mod coordinator;
mod pacing;
mod retry;

pub use client::{classify, HttpIndexClient, IndexClient, RemoteError, RemoteErrorKind};
pub use coordinator::SubmissionEngine;
pub use pacing::RateLimiter;
pub use retry::RetryPolicy;

use crate::state::SubmissionOutcome;
use crate::storage::RunCounts;

/// Why a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Every URL after the start offset was looked at
    #[default]
    Exhausted,
    /// The daily limit of non-skipped submissions was reached
    DailyLimit,
}

/// Totals and per-URL outcomes of one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub submitted: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Remote calls made, retries included
    pub attempts: u64,
    pub stop_reason: StopReason,
    /// Outcomes in processing order
    pub outcomes: Vec<(String, SubmissionOutcome)>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, url: String, outcome: SubmissionOutcome) {
        match &outcome {
            SubmissionOutcome::Success { .. } => self.submitted += 1,
            SubmissionOutcome::Skipped => self.skipped += 1,
            SubmissionOutcome::Failed { .. } => self.failed += 1,
        }
        self.attempts += u64::from(outcome.attempts());
        self.outcomes.push((url, outcome));
    }

    pub fn counts(&self) -> RunCounts {
        RunCounts {
            submitted: self.submitted,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}
