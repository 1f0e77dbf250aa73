//! Error types for file transfers.
//!
//! A [`TransferError`] always describes one descriptor's transfer. The
//! orchestrator renders it into the error report under the descriptor's
//! source page, so messages carry the file URL or path they refer to.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while transferring a single file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client gave up waiting for the server.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The descriptor's deadline elapsed before the transfer finished.
    #[error("timed out downloading {url}: deadline of {}ms exceeded", deadline.as_millis())]
    DeadlineExceeded {
        /// The URL whose transfer was abandoned.
        url: String,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create directory, create file, write).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The download URL has no usable path segment to name the file after.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },
}

impl TransferError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a client timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a deadline error.
    pub fn deadline_exceeded(url: impl Into<String>, deadline: Duration) -> Self {
        Self::DeadlineExceeded {
            url: url.into(),
            deadline,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true if the transfer was abandoned because time ran out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::DeadlineExceeded { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path the source error lacks, so callers go through the helpers above.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_deadline_display() {
        let error =
            TransferError::deadline_exceeded("https://cdn.example/1.jpg", Duration::from_millis(1));
        let msg = error.to_string();
        assert!(msg.contains("timed out"), "Expected 'timed out' in: {msg}");
        assert!(msg.contains("1ms"), "Expected deadline in: {msg}");
        assert!(msg.contains("https://cdn.example/1.jpg"));
        assert!(error.is_timeout());
    }

    #[test]
    fn test_transfer_error_http_status_display() {
        let error = TransferError::http_status("https://cdn.example/2.png", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://cdn.example/2.png"));
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_transfer_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = TransferError::io(PathBuf::from("/tmp/comic/0.jpg"), io_error);
        assert!(error.to_string().contains("/tmp/comic/0.jpg"));
    }

    #[test]
    fn test_transfer_error_client_timeout_is_timeout() {
        assert!(TransferError::timeout("https://cdn.example/3.gif").is_timeout());
    }
}
