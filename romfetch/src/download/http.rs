//! HTTP file downloader with resume support.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    CancelToken, DownloadConfig, DownloadError, DownloadProgress, DownloadResult, ProgressTracker,
};
use crate::http::{HttpClient, RemoteBody};

/// How a transfer ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file is complete at `path`.
    Completed { path: PathBuf, bytes: u64 },
    /// Cancelled at a chunk boundary; the partial file is kept for resume.
    Cancelled { bytes_on_disk: u64 },
}

/// Where the body of an opened response lands in the destination file.
enum Plan {
    /// Write the body starting at this offset.
    Write { offset: u64, response: RemoteBody },
    /// The file on disk is already the whole resource.
    AlreadyComplete { bytes: u64 },
}

/// Streams one URL to one local path, resuming from a partial file.
#[derive(Clone)]
pub struct Downloader {
    client: Arc<dyn HttpClient>,
    config: DownloadConfig,
}

impl Downloader {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self::with_config(client, DownloadConfig::default())
    }

    pub fn with_config(client: Arc<dyn HttpClient>, config: DownloadConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download `url` into `dest`, resuming from whatever `dest` already holds.
    ///
    /// `on_progress` is called once per chunk written, and once more at the
    /// end if the last chunk did not already report the final size. It runs on
    /// the calling thread.
    ///
    /// # Errors
    ///
    /// Transport, status and disk failures are returned as [`DownloadError`].
    /// The destination file keeps every byte written before the failure.
    pub fn fetch<F>(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> DownloadResult<DownloadOutcome>
    where
        F: FnMut(&DownloadProgress),
    {
        let existing = dest.metadata().map(|m| m.len()).unwrap_or(0);

        let (offset, mut response) = match self.plan(url, existing)? {
            Plan::AlreadyComplete { bytes } => {
                tracing::info!(url, path = %dest.display(), bytes, "Download already complete");
                on_progress(&ProgressTracker::new(bytes, Some(bytes)).snapshot(bytes));
                return Ok(DownloadOutcome::Completed {
                    path: dest.to_path_buf(),
                    bytes,
                });
            }
            Plan::Write { offset, response } => (offset, response),
        };

        // Chunked responses carry no Content-Length; the Content-Range total
        // still bounds the transfer.
        let total = response
            .content_length
            .map(|len| offset + len)
            .or_else(|| response.content_range.and_then(|r| r.total));
        let mut file = self.prepare_destination(dest, offset)?;
        tracing::info!(
            url,
            path = %dest.display(),
            resumed_from = offset,
            total_bytes = ?total,
            "Starting download"
        );

        let tracker = ProgressTracker::new(offset, total);
        let mut buffer = vec![0u8; self.config.chunk_size];
        let mut downloaded = offset;
        let mut reported = None;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(url, bytes_on_disk = downloaded, "Download cancelled");
                return Ok(DownloadOutcome::Cancelled {
                    bytes_on_disk: downloaded,
                });
            }

            let bytes_read = match response.body.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(url, bytes_on_disk = downloaded, error = %e, "Download interrupted");
                    return Err(DownloadError::Read {
                        url: url.to_string(),
                        bytes_on_disk: downloaded,
                        source: e,
                    });
                }
            };

            if bytes_read == 0 {
                break;
            }

            file.write_all(&buffer[..bytes_read])
                .map_err(|e| DownloadError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;
            on_progress(&tracker.snapshot(downloaded));
            reported = Some(downloaded);
        }

        file.flush().map_err(|e| DownloadError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if let Some(expected) = total {
            if downloaded != expected {
                return Err(DownloadError::Incomplete {
                    url: url.to_string(),
                    expected,
                    received: downloaded,
                });
            }
        }

        if reported != Some(downloaded) {
            on_progress(&tracker.snapshot(downloaded));
        }

        tracing::info!(url, path = %dest.display(), bytes = downloaded, "Download complete");
        Ok(DownloadOutcome::Completed {
            path: dest.to_path_buf(),
            bytes: downloaded,
        })
    }

    /// Open the transfer and decide what to do with the bytes already on disk.
    fn plan(&self, url: &str, existing: u64) -> DownloadResult<Plan> {
        if existing == 0 {
            return Ok(Plan::Write {
                offset: 0,
                response: self.open_fresh(url)?,
            });
        }

        let response = self.client.open(url, Some(existing))?;
        let range = response.content_range;

        match response.status {
            206 => match range.and_then(|r| r.start()) {
                Some(start) if start != existing => {
                    tracing::warn!(url, existing, start, "Partial response at wrong offset, restarting");
                    self.restart(url)
                }
                _ => Ok(Plan::Write {
                    offset: existing,
                    response,
                }),
            },
            416 => match range.and_then(|r| r.total) {
                Some(total) if total == existing => Ok(Plan::AlreadyComplete { bytes: existing }),
                total => {
                    tracing::warn!(url, existing, remote_total = ?total, "Partial file is stale, restarting");
                    self.restart(url)
                }
            },
            status if response.is_success() => {
                tracing::info!(url, existing, status, "Server ignored range request, restarting");
                Ok(Plan::Write {
                    offset: 0,
                    response,
                })
            }
            status => Err(DownloadError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    fn restart(&self, url: &str) -> DownloadResult<Plan> {
        Ok(Plan::Write {
            offset: 0,
            response: self.open_fresh(url)?,
        })
    }

    fn open_fresh(&self, url: &str) -> DownloadResult<RemoteBody> {
        let response = self.client.open(url, None)?;
        if !response.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }

    /// Open the destination for appending at `offset`, or truncate it when
    /// starting from zero.
    fn prepare_destination(&self, dest: &Path, offset: u64) -> DownloadResult<File> {
        let write_err = |e| DownloadError::Write {
            path: dest.to_path_buf(),
            source: e,
        };

        if offset > 0 {
            return OpenOptions::new().append(true).open(dest).map_err(write_err);
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DownloadError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        File::create(dest).map_err(write_err)
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
