//! Per-request download task.
//!
//! Drives one [`DownloadRequest`] end to end: issue the request, sniff the
//! content type, resolve and reserve the output name, stream the body to
//! disk, and retry transient failures.
//!
//! The response body can only be consumed once, so the sniff prefix (up to
//! [`SNIFF_PREFIX_LEN`] bytes) is buffered from the stream and replayed as
//! the first bytes of the written file; the resource is never requested
//! twice. The output file is opened with exclusive-create semantics so the
//! in-memory reservation is also backed by an atomic create-if-absent on
//! disk. Once a task has reserved a name it keeps that name across its own
//! retries; reservations are never released, even on failure.

use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::HttpClient;
use super::constants::WRITE_BUFFER_BYTES;
use super::error::DownloadError;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::naming::{NamingLedger, SNIFF_PREFIX_LEN, resolve_filename, sniff};
use crate::source::DownloadRequest;

/// Terminal state of a download task.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// The resource was saved.
    Succeeded {
        /// Final path of the saved file.
        saved_path: PathBuf,
    },
    /// The resource could not be saved.
    Failed {
        /// Short machine-readable failure kind.
        error_kind: String,
        /// Human-readable failure message.
        message: String,
    },
}

/// Outcome of one download request; exactly one is produced per request.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    /// The requested URL.
    pub url: String,
    /// How the task ended.
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl TaskOutcome {
    /// Creates a succeeded outcome.
    #[must_use]
    pub fn succeeded(url: impl Into<String>, saved_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            status: TaskStatus::Succeeded { saved_path },
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(
        url: impl Into<String>,
        error_kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status: TaskStatus::Failed {
                error_kind: error_kind.into(),
                message: message.into(),
            },
        }
    }

    /// Returns true when the task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded { .. })
    }

    /// Returns the saved path for a succeeded outcome.
    #[must_use]
    pub fn saved_path(&self) -> Option<&Path> {
        match &self.status {
            TaskStatus::Succeeded { saved_path } => Some(saved_path),
            TaskStatus::Failed { .. } => None,
        }
    }

    /// Returns the failure message for a failed outcome.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            TaskStatus::Succeeded { .. } => None,
            TaskStatus::Failed { message, .. } => Some(message),
        }
    }
}

/// Downloads one resource end to end.
#[derive(Debug)]
pub struct DownloadTask {
    request: DownloadRequest,
}

impl DownloadTask {
    /// Creates a task for one request.
    #[must_use]
    pub fn new(request: DownloadRequest) -> Self {
        Self { request }
    }

    /// Runs the task to completion, retrying transient failures per `policy`.
    ///
    /// Never returns an error: every failure becomes a [`TaskOutcome`].
    #[instrument(skip_all, fields(url = %self.request.url))]
    pub async fn run(
        self,
        client: &HttpClient,
        ledger: &NamingLedger,
        dest_dir: &Path,
        policy: &RetryPolicy,
    ) -> TaskOutcome {
        let url = self.request.url.clone();
        let mut reserved: Option<String> = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            match self.attempt(client, ledger, dest_dir, &mut reserved).await {
                Ok(path) => return TaskOutcome::succeeded(url, path),
                Err(e) => {
                    let failure_type = classify_error(&e);
                    match policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            warn!(
                                attempt = next_attempt,
                                max_attempts = policy.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %e,
                                "retrying download"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(attempts = attempt, %reason, error = %e, "download failed");
                            return TaskOutcome::failed(url, e.kind(), e.to_string());
                        }
                    }
                }
            }
        }
    }

    /// One fetch-sniff-name-write pass.
    async fn attempt(
        &self,
        client: &HttpClient,
        ledger: &NamingLedger,
        dest_dir: &Path,
        reserved: &mut Option<String>,
    ) -> Result<PathBuf, DownloadError> {
        let url = &self.request.url;
        let parsed_url =
            Url::parse(url).map_err(|_| DownloadError::invalid_url(url.clone()))?;

        let response = client.get(url).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        // Buffer the sniff prefix; the remaining stream is spliced back in
        // during the write below.
        let mut stream = response.bytes_stream();
        let mut prefix: Vec<u8> = Vec::with_capacity(SNIFF_PREFIX_LEN);
        while prefix.len() < SNIFF_PREFIX_LEN {
            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| DownloadError::network(url.clone(), e))?;
                    prefix.extend_from_slice(&chunk);
                }
                None => break,
            }
        }

        let sniffed = sniff(content_type.as_deref(), Some(&prefix), parsed_url.path());

        // A name reserved by an earlier attempt of this task is kept; its
        // partial file (if any) was removed on failure, so exclusive create
        // succeeds again.
        let final_name = if let Some(name) = reserved.as_ref() {
            name.clone()
        } else {
            let candidate = resolve_filename(
                self.request.requested_name.as_deref(),
                url,
                &sniffed.extension_or_default(),
            );
            let name = ledger.reserve(&candidate);
            debug!(
                candidate = %candidate,
                reserved = %name,
                sniff_source = ?sniffed.source,
                "resolved output name"
            );
            *reserved = Some(name.clone());
            name
        };

        let file_path = dest_dir.join(&final_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;

        let write_result = write_body(file, &prefix, &mut stream, url, &file_path).await;
        if write_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }
        let bytes_written = write_result?;

        info!(path = %file_path.display(), bytes = bytes_written, "download complete");
        Ok(file_path)
    }
}

/// Writes the buffered prefix and the remaining stream to `file`.
///
/// Extracted so the caller can clean up the partial file on error.
async fn write_body<S, B>(
    file: tokio::fs::File,
    prefix: &[u8],
    stream: &mut S,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

    writer
        .write_all(prefix)
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
    let mut bytes_written = prefix.len() as u64;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(chunk.as_ref())
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
        bytes_written += chunk.as_ref().len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
