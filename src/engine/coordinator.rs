//! Submission engine - the end-to-end run
//!
//! A run proceeds in this order:
//! 1. Record the run start in the ledger database
//! 2. Load the sitemap (no credential work happens before this succeeds)
//! 3. Obtain a credential
//! 4. Drop the first `start-offset` URLs
//! 5. Walk the rest in order, skipping ledger URLs, until the daily limit is
//!    reached or the list ends
//! 6. Record the final run status

use crate::auth::{Credential, CredentialProvider};
use crate::config::{Config, Operation, RunConfig, SubmissionConfig};
use crate::engine::client::{IndexClient, RemoteErrorKind};
use crate::engine::pacing::RateLimiter;
use crate::engine::retry::RetryPolicy;
use crate::engine::{RunSummary, StopReason};
use crate::sitemap::SitemapLoader;
use crate::state::{FailureKind, ResumeLedger, SubmissionOutcome};
use crate::storage::RunStatus;
use crate::{IndexerError, Result};

/// Drives a submission run over its collaborators
pub struct SubmissionEngine {
    loader: SitemapLoader,
    credentials: Box<dyn CredentialProvider>,
    client: Box<dyn IndexClient>,
    ledger: ResumeLedger,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl SubmissionEngine {
    pub fn new(
        loader: SitemapLoader,
        credentials: Box<dyn CredentialProvider>,
        client: Box<dyn IndexClient>,
        ledger: ResumeLedger,
        submission: &SubmissionConfig,
    ) -> Self {
        Self {
            loader,
            credentials,
            client,
            ledger,
            limiter: RateLimiter::new(submission.pacing_interval()),
            retry: RetryPolicy::from(submission),
        }
    }

    pub fn ledger(&self) -> &ResumeLedger {
        &self.ledger
    }

    /// Runs one submission pass for `config`
    ///
    /// The run is recorded with its final status whether it completes, stops
    /// at the daily limit, or aborts with an error.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The list was exhausted or the daily limit reached
    /// * `Err(IndexerError::Sitemap)` - The sitemap could not be loaded
    /// * `Err(IndexerError::Auth)` - No usable credential could be obtained
    /// * `Err(IndexerError::Persist)` - The ledger could not be written
    /// * `Err(IndexerError::QuotaExceeded)` - The provider's daily quota ran out
    pub async fn run(&mut self, config: &Config, config_hash: &str) -> Result<RunSummary> {
        if config.run.operation != self.ledger.operation() {
            return Err(crate::ConfigError::Validation(format!(
                "ledger tracks {} but the run requests {}",
                self.ledger.operation(),
                config.run.operation
            ))
            .into());
        }

        let run_id = self.ledger.begin_run(config_hash)?;
        tracing::info!("Starting run {} ({})", run_id, config.run.operation);

        let mut summary = RunSummary::default();
        let result = self.execute(&config.run, &mut summary).await;

        let status = match &result {
            Ok(StopReason::Exhausted) => RunStatus::Completed,
            Ok(StopReason::DailyLimit) => RunStatus::LimitReached,
            Err(IndexerError::QuotaExceeded { .. }) => RunStatus::QuotaExceeded,
            Err(_) => RunStatus::Failed,
        };
        let finished = self.ledger.finish_run(status, summary.counts());

        match result {
            Ok(stop_reason) => {
                finished?;
                summary.stop_reason = stop_reason;
                tracing::info!(
                    "Run {} finished: {} submitted, {} skipped, {} failed",
                    run_id,
                    summary.submitted,
                    summary.skipped,
                    summary.failed
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(persist) = finished {
                    tracing::warn!("Failed to record status of run {}: {}", run_id, persist);
                }
                tracing::error!(
                    "Run {} aborted after {} submitted, {} skipped, {} failed: {}",
                    run_id,
                    summary.submitted,
                    summary.skipped,
                    summary.failed,
                    e
                );
                Err(e)
            }
        }
    }

    async fn execute(&mut self, run: &RunConfig, summary: &mut RunSummary) -> Result<StopReason> {
        let urls = self.loader.load(&run.sitemap_url).await?;
        let mut credential = self.credentials.obtain().await?;

        let total = urls.len();
        if run.start_offset > 0 {
            tracing::info!(
                "Skipping the first {} of {} URLs (start offset)",
                run.start_offset.min(total),
                total
            );
        }

        let mut submissions: u32 = 0;
        for entry in urls.into_iter().skip(run.start_offset) {
            let url = entry.as_str().to_string();
            let progress = format!("[{}/{}]", entry.position + 1, total);

            if self.ledger.contains(&url) {
                tracing::debug!("{} Already submitted: {}", progress, url);
                summary.record(url, SubmissionOutcome::Skipped);
                continue;
            }

            if submissions >= run.daily_limit {
                tracing::info!(
                    "Daily limit of {} submissions reached; resume with the next run",
                    run.daily_limit
                );
                return Ok(StopReason::DailyLimit);
            }
            submissions += 1;

            tracing::info!("{} Submitting {}", progress, url);
            let outcome = self.submit(&url, run.operation, &mut credential).await?;

            match &outcome {
                SubmissionOutcome::Success {
                    notify_time,
                    attempts,
                } => {
                    self.ledger.record(&url)?;
                    tracing::info!(
                        "{} Accepted (notify time {}, {} attempt(s))",
                        progress,
                        notify_time,
                        attempts
                    );
                }
                SubmissionOutcome::Failed {
                    kind,
                    attempts,
                    message,
                } => {
                    tracing::warn!(
                        "{} Failed ({}, {} attempt(s)): {}",
                        progress,
                        kind,
                        attempts,
                        message
                    );
                }
                SubmissionOutcome::Skipped => {}
            }
            summary.record(url, outcome);
        }

        Ok(StopReason::Exhausted)
    }

    /// Submits one URL, retrying per policy
    ///
    /// Only a provider quota exhaustion or a credential failure is an `Err`;
    /// everything else becomes an outcome for this URL.
    async fn submit(
        &mut self,
        url: &str,
        operation: Operation,
        credential: &mut Credential,
    ) -> Result<SubmissionOutcome> {
        let mut attempts = 0;
        let mut refreshed = false;

        loop {
            attempts += 1;
            let fresh = self.credentials.ensure_fresh(credential).await?;
            *credential = fresh;
            self.limiter.wait_turn().await;

            let error = match self
                .client
                .publish(url, operation, &credential.access_token)
                .await
            {
                Ok(notify_time) => {
                    return Ok(SubmissionOutcome::Success {
                        notify_time,
                        attempts,
                    })
                }
                Err(error) => error,
            };

            match error.kind {
                RemoteErrorKind::QuotaExhausted => {
                    return Err(IndexerError::QuotaExceeded {
                        url: url.to_string(),
                        message: error.message,
                    });
                }
                RemoteErrorKind::Permanent => {
                    return Ok(SubmissionOutcome::Failed {
                        kind: FailureKind::Rejected,
                        attempts,
                        message: error.message,
                    });
                }
                RemoteErrorKind::Unauthorized if refreshed => {
                    return Ok(SubmissionOutcome::Failed {
                        kind: FailureKind::Unauthorized,
                        attempts,
                        message: error.message,
                    });
                }
                RemoteErrorKind::Unauthorized => {
                    tracing::warn!("Credential rejected ({}), refreshing", error.message);
                    refreshed = true;
                    let refreshed_credential = self.credentials.refresh(credential).await?;
                    *credential = refreshed_credential;
                }
                RemoteErrorKind::Transient => {
                    if attempts >= self.retry.max_attempts {
                        return Ok(SubmissionOutcome::Failed {
                            kind: FailureKind::RetriesExhausted,
                            attempts,
                            message: error.message,
                        });
                    }
                    let wait = self.retry.wait_before_retry(attempts, error.retry_after);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempts,
                        self.retry.max_attempts,
                        url,
                        error.message,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
