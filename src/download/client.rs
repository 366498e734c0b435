//! HTTP client wrapper for streaming downloads.
//!
//! Thin layer over reqwest: browser-like User-Agent, per-attempt timeouts,
//! optional caller-supplied static headers, and error mapping into
//! [`DownloadError`]. Create one client and reuse it across the batch to
//! benefit from connection pooling.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderMap;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;

/// Browser-like User-Agent sent with every request.
///
/// Some hosts refuse requests that do not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client for streaming downloads.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 30s between
    /// body chunks).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values (seconds).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(None, connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Creates a client that sends `extra_headers` with every request, in
    /// addition to the default header set.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// headers.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_extra_headers(extra_headers: HeaderMap) -> Self {
        let client = build_client(Some(extra_headers), CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("failed to build HTTP client with supplied headers");
        Self { client }
    }

    /// Issues a streaming GET and returns the response once headers arrive.
    ///
    /// The body has not been consumed; callers stream it chunk by chunk.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] when the URL does not parse
    /// - [`DownloadError::Timeout`] when the request times out
    /// - [`DownloadError::Network`] for other transport failures
    /// - [`DownloadError::HttpStatus`] for non-2xx responses
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        if url::Url::parse(url).is_err() {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn build_client(
    extra_headers: Option<HeaderMap>,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(BROWSER_USER_AGENT);
    if let Some(headers) = extra_headers {
        builder = builder.default_headers(headers);
    }
    builder.build()
}
