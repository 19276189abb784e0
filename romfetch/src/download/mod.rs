//! Resumable single-file downloads.
//!
//! This module provides:
//! - Range-based resume from a partial file on disk (`http`)
//! - Progress snapshots with percentage, throughput and ETA (`progress`)
//! - Background transfers with a progress channel and cooperative
//!   cancellation (`task`)
//!
//! # Resume policy
//!
//! The size of the destination file is the resume offset. A non-zero offset
//! is requested with `Range: bytes=<offset>-` and the response decides what
//! happens to the bytes already on disk:
//!
//! | Response | Action |
//! |---|---|
//! | `206` starting at the offset | append |
//! | `206` starting elsewhere | restart from zero |
//! | `200` | server ignored the range, restart from zero |
//! | `416` with total equal to the offset | already complete |
//! | `416` otherwise | partial file is stale, restart from zero |
//!
//! A failed transfer never truncates or deletes what has been written.
//!
//! # Architecture
//!
//! ```text
//! Downloader ──fetch──► HttpClient::open ──► RemoteBody
//!     │                                          │
//!     │                                   chunked copy
//!     │                                          ▼
//!     ├── ProgressTracker ──► on_progress   destination file
//!     │
//!     └──spawn──► worker thread ──► DownloadHandle { Receiver, CancelToken }
//! ```

mod error;
mod http;
mod progress;
mod task;

pub use error::{DownloadError, DownloadResult};
pub use http::{DownloadOutcome, Downloader};
pub use progress::{DownloadProgress, ProgressTracker};
pub use task::{CancelToken, DownloadHandle};

/// Default read size for streaming a response body (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Tuning for [`Downloader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Bytes read from the response per chunk. Progress is reported once per
    /// chunk and cancellation is checked at chunk boundaries.
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DownloadConfig {
    /// Set the chunk size. Zero is raised to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
