//! Bounded retry for transient download failures.
//!
//! A failed attempt is classified into a [`FailureType`]; the [`RetryPolicy`]
//! then decides whether to try again and after what delay. Attempt count,
//! backoff duration, and the retryable/non-retryable split are explicit
//! policy parameters, not inline constants.
//!
//! Classification follows the failure surface, not the status code table:
//! anything the network or the remote server did (connection errors,
//! timeouts, any non-2xx status) may clear up on a later attempt and is
//! retried; anything local (filesystem errors, malformed URLs) cannot and
//! fails immediately.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::DownloadError;

/// Default maximum attempts per request (including the initial attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts (2 seconds).
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Classification of a failed download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// May succeed on retry: timeouts, connection errors, non-2xx responses.
    Transient,

    /// Won't succeed regardless of retries: invalid URL, filesystem errors.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// The attempt number about to run (1-indexed).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior.
///
/// Defaults: 3 attempts with a fixed 2 second delay between them and no
/// jitter. Jitter can be enabled to spread simultaneous retries apart.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay between attempts.
    backoff: Duration,

    /// Upper bound of random jitter added to each delay, if enabled.
    jitter: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            jitter: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit attempt count and backoff.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            jitter: None,
        }
    }

    /// Creates a policy with a custom attempt count and the default backoff.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Enables random jitter of up to `max_jitter` on top of each delay.
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.jitter = Some(max_jitter);
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the configured delay between attempts.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Decides whether the attempt that just failed should be retried.
    ///
    /// `attempt` is the 1-indexed number of the attempt that failed.
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.backoff + self.sample_jitter(),
            attempt: attempt + 1,
        }
    }

    fn sample_jitter(&self) -> Duration {
        match self.jitter {
            Some(max_jitter) if !max_jitter.is_zero() => {
                let mut rng = rand::thread_rng();
                let jitter_ms = rng.gen_range(0..=u64::try_from(max_jitter.as_millis()).unwrap_or(u64::MAX));
                Duration::from_millis(jitter_ms)
            }
            _ => Duration::ZERO,
        }
    }
}

/// Classifies a download error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Network | Transient |
/// | Timeout | Transient |
/// | HttpStatus (any non-2xx) | Transient |
/// | Io | Permanent |
/// | InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Network { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::HttpStatus { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}
