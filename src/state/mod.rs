//! State module for tracking submission progress
//!
//! # Components
//!
//! - `ResumeLedger`: durable set of URLs already submitted, used to resume runs
//! - `SubmissionOutcome`: what happened to each URL during a run

mod ledger;
mod outcome;

// Re-export main types
pub use ledger::ResumeLedger;
pub use outcome::{FailureKind, SubmissionOutcome};
