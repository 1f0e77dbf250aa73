//! HTTP transport shared by page resolution and file transfers.
//!
//! One [`HttpClient`] is created per process and cloned into every provider
//! and transfer worker, so all requests share a connection pool.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::TransferError;
use crate::provider::ResolutionError;
use crate::user_agent;

/// HTTP client with streaming GET support.
///
/// # Example
///
/// ```no_run
/// use media_downloader::download::HttpClient;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let url = url::Url::parse("https://cdn.example.com/0.jpg")?;
/// let bytes = client
///     .download_to_path(&url, Path::new("./out/0.jpg"), Duration::from_secs(90))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
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
    /// Creates a client with the default timeouts (30s connect, 5min read).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit timeouts in seconds.
    ///
    /// The read timeout bounds each socket read, not the whole request; a
    /// transfer's total duration is bounded only by its deadline.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Fetches a page body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::Fetch`] on network failure and
    /// [`ResolutionError::HttpStatus`] on a non-success status.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &Url) -> Result<String, ResolutionError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolutionError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::http_status(url.as_str(), status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ResolutionError::fetch(url.as_str(), e))
    }

    /// Streams the body of `url` into `path`, giving up after `deadline`.
    ///
    /// The body is written chunk by chunk and never buffered whole. An
    /// existing file at `path` is overwritten. If the transfer fails after
    /// the file was created, the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DeadlineExceeded`] when `deadline` elapses,
    /// and the matching variant for network, status, and disk failures.
    #[instrument(level = "debug", skip(self, path), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(
        &self,
        url: &Url,
        path: &Path,
        deadline: Duration,
    ) -> Result<u64, TransferError> {
        let expires_at = Instant::now() + deadline;

        let response = timeout_at(expires_at, self.send_get(url))
            .await
            .map_err(|_| TransferError::deadline_exceeded(url.as_str(), deadline))??;

        let mut file = File::create(path)
            .await
            .map_err(|e| TransferError::io(path, e))?;

        let result = match timeout_at(expires_at, stream_to_file(&mut file, response, url, path)).await
        {
            Ok(result) => result,
            Err(_) => Err(TransferError::deadline_exceeded(url.as_str(), deadline)),
        };

        if result.is_err() {
            drop(file);
            debug!(path = %path.display(), "removing partial file after failed transfer");
            let _ = tokio::fs::remove_file(path).await;
        }

        result
    }

    async fn send_get(&self, url: &Url) -> Result<reqwest::Response, TransferError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::timeout(url.as_str())
            } else {
                TransferError::network(url.as_str(), e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::http_status(url.as_str(), status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &Url,
    path: &Path,
) -> Result<u64, TransferError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                TransferError::timeout(url.as_str())
            } else {
                TransferError::network(url.as_str(), e)
            }
        })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(path, e))?;

    Ok(bytes_written)
}
