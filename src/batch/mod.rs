//! Batch orchestration for concurrent downloads.
//!
//! The [`BatchOrchestrator`] fans a list of requests out across a
//! semaphore-bounded pool of download tasks, collects outcomes as they
//! complete, and folds them into a [`BatchSummary`]. A single task's failure
//! (or panic) never aborts the batch: every request yields exactly one
//! [`TaskOutcome`], and `run` returns only after all of them have resolved.
//!
//! # Concurrency Model
//!
//! - Each download runs in its own Tokio task
//! - A semaphore permit bounds how many tasks fetch/write simultaneously
//! - Permits are released automatically when tasks complete (RAII)
//! - Outcomes are folded single-writer in the collector loop; the naming
//!   ledger's mutex is the only synchronization shared between workers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::download::{DownloadTask, HttpClient, RetryPolicy, TaskOutcome};
use crate::naming::NamingLedger;
use crate::source::DownloadRequest;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default number of simultaneous downloads.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Error type for batch orchestration.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The destination directory could not be prepared.
    #[error("cannot prepare destination directory {path}: {source}")]
    DestinationDir {
        /// The destination directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate result of a batch run.
///
/// Built incrementally as outcomes arrive; `failed_urls` is ordered by task
/// completion, not submission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Number of requests that saved a file.
    pub success_count: usize,
    /// Number of requests that failed.
    pub failed_count: usize,
    /// URLs of failed requests, in completion order.
    pub failed_urls: Vec<String>,
}

impl BatchSummary {
    /// Total number of requests processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.success_count + self.failed_count
    }

    /// Returns true when no request failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed_count == 0
    }

    fn record(&mut self, outcome: &TaskOutcome) {
        if outcome.is_success() {
            self.success_count += 1;
        } else {
            self.failed_count += 1;
            self.failed_urls.push(outcome.url.clone());
        }
    }
}

/// Fans download requests out across a bounded worker pool.
#[derive(Debug)]
pub struct BatchOrchestrator {
    concurrency: usize,
    retry_policy: RetryPolicy,
}

impl BatchOrchestrator {
    /// Creates an orchestrator with the given concurrency limit and retry
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if `concurrency` is outside
    /// 1-100.
    pub fn new(concurrency: usize, retry_policy: RetryPolicy) -> Result<Self, BatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(BatchError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            "creating batch orchestrator"
        );

        Ok(Self {
            concurrency,
            retry_policy,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads all requests into `dest_dir` and returns the summary.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DestinationDir`] if the destination directory
    /// cannot be created or scanned. Individual download failures do NOT
    /// cause this method to error; they are counted in the summary.
    pub async fn run(
        &self,
        requests: Vec<DownloadRequest>,
        client: &HttpClient,
        dest_dir: &Path,
    ) -> Result<BatchSummary, BatchError> {
        self.run_with_observer(requests, client, dest_dir, |_| {})
            .await
    }

    /// Like [`run`](Self::run), invoking `observer` once per outcome as tasks
    /// complete (completion order). Used for progress reporting.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    #[instrument(skip_all, fields(requests = requests.len(), dest_dir = %dest_dir.display()))]
    pub async fn run_with_observer<F>(
        &self,
        requests: Vec<DownloadRequest>,
        client: &HttpClient,
        dest_dir: &Path,
        mut observer: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(&TaskOutcome),
    {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| BatchError::DestinationDir {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;

        let ledger = Arc::new(NamingLedger::scan_dir(dest_dir).map_err(|e| {
            BatchError::DestinationDir {
                path: dest_dir.to_path_buf(),
                source: e,
            }
        })?);

        info!(requests = requests.len(), "starting batch");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = FuturesUnordered::new();

        for request in requests {
            let url = request.url.clone();
            let client = client.clone();
            let ledger = Arc::clone(&ledger);
            let semaphore = Arc::clone(&semaphore);
            let dest_dir = dest_dir.to_path_buf();
            let retry_policy = self.retry_policy.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed while tasks run; a closed
                // semaphore still must produce an outcome.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return TaskOutcome::failed(
                        request.url.clone(),
                        "internal",
                        "worker pool closed unexpectedly",
                    );
                };
                DownloadTask::new(request)
                    .run(&client, &ledger, &dest_dir, &retry_policy)
                    .await
            });

            // A panicking task still yields exactly one outcome.
            in_flight.push(async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_error) => {
                        warn!(url = %url, error = %join_error, "download task panicked");
                        TaskOutcome::failed(
                            url,
                            "panic",
                            format!("download task panicked: {join_error}"),
                        )
                    }
                }
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(outcome) = in_flight.next().await {
            summary.record(&outcome);
            observer(&outcome);
        }

        info!(
            completed = summary.success_count,
            failed = summary.failed_count,
            total = summary.total(),
            "batch complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_valid_concurrency() {
        let orchestrator = BatchOrchestrator::new(1, RetryPolicy::default()).unwrap();
        assert_eq!(orchestrator.concurrency(), 1);

        let orchestrator = BatchOrchestrator::new(100, RetryPolicy::default()).unwrap();
        assert_eq!(orchestrator.concurrency(), 100);
    }

    #[test]
    fn test_orchestrator_invalid_concurrency_zero() {
        assert!(matches!(
            BatchOrchestrator::new(0, RetryPolicy::default()),
            Err(BatchError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_orchestrator_invalid_concurrency_too_high() {
        assert!(matches!(
            BatchOrchestrator::new(101, RetryPolicy::default()),
            Err(BatchError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_orchestrator_stores_retry_policy() {
        let policy = RetryPolicy::with_max_attempts(5);
        let orchestrator = BatchOrchestrator::new(3, policy).unwrap();
        assert_eq!(orchestrator.retry_policy().max_attempts(), 5);
    }

    #[test]
    fn test_default_concurrency_constant() {
        assert_eq!(DEFAULT_CONCURRENCY, 3);
    }

    #[test]
    fn test_summary_record_success_and_failure() {
        let mut summary = BatchSummary::default();
        summary.record(&TaskOutcome::succeeded("https://a.test/1", "a.pdf".into()));
        summary.record(&TaskOutcome::failed("https://a.test/2", "timeout", "boom"));
        summary.record(&TaskOutcome::failed("https://a.test/3", "timeout", "boom"));

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failed_count, 2);
        assert_eq!(summary.total(), 3);
        assert!(!summary.all_succeeded());
        assert_eq!(
            summary.failed_urls,
            vec!["https://a.test/2".to_string(), "https://a.test/3".to_string()]
        );
    }

    #[test]
    fn test_summary_serializes() {
        let mut summary = BatchSummary::default();
        summary.record(&TaskOutcome::failed("https://a.test/x", "timeout", "boom"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed_count"], 1);
        assert_eq!(json["failed_urls"][0], "https://a.test/x");
    }

    #[test]
    fn test_error_display() {
        let error = BatchError::InvalidConcurrency { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains('0'));
    }
}
