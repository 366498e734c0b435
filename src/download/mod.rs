//! HTTP download engine for streaming resources to disk.
//!
//! One [`DownloadTask`] per requested resource: it fetches with a streaming
//! GET, sniffs the content type from headers and the buffered body prefix,
//! reserves a collision-free output name, and writes the file. Transient
//! failures are retried under an explicit [`RetryPolicy`].

mod client;
mod constants;
mod error;
mod retry;
mod task;

pub use client::{BROWSER_USER_AGENT, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use task::{DownloadTask, TaskOutcome, TaskStatus};
