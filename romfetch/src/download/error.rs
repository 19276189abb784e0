//! Download error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

/// Result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Errors that can occur during a transfer.
///
/// Every variant leaves the destination file as it was at the moment of
/// failure, so the same call can be repeated to resume.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request could not be sent.
    #[error(transparent)]
    Request(#[from] HttpError),

    /// The server answered with a status that cannot be downloaded.
    #[error("download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body failed mid-transfer.
    #[error("connection to {url} failed after {bytes_on_disk} bytes: {source}")]
    Read {
        url: String,
        bytes_on_disk: u64,
        source: std::io::Error,
    },

    /// The destination could not be opened or written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The body ended before the advertised length was received.
    #[error("download of {url} ended at {received} of {expected} bytes")]
    Incomplete {
        url: String,
        expected: u64,
        received: u64,
    },

    /// The worker thread could not be started.
    #[error("failed to start download worker: {0}")]
    Spawn(std::io::Error),

    /// The worker thread panicked.
    #[error("download worker panicked")]
    WorkerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DownloadError::Incomplete {
            url: "https://example.com/a.zip".to_string(),
            expected: 100,
            received: 40,
        };
        assert_eq!(
            err.to_string(),
            "download of https://example.com/a.zip ended at 40 of 100 bytes"
        );

        let err = DownloadError::Status {
            url: "https://example.com/a.zip".to_string(),
            status: 503,
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_request_error_is_transparent() {
        let err: DownloadError = HttpError::Timeout {
            url: "https://example.com".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "request to https://example.com timed out");
    }
}
