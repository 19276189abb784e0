//! Background transfers.
//!
//! A transfer spawned with [`Downloader::spawn`] runs on its own named thread.
//! Progress is handed back over a bounded `mpsc` channel, so the thread that
//! owns UI state drains it at its own pace instead of being called into from
//! the worker. When the queue is full the worker keeps only the newest
//! snapshot and delivers it once there is room; the final snapshot is always
//! delivered while the receiver is alive.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{DownloadError, DownloadOutcome, DownloadProgress, DownloadResult, Downloader};

/// Cooperative cancellation signal, checked once per chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress snapshots queued between the worker and the handle.
pub const PROGRESS_QUEUE_CAPACITY: usize = 64;

/// Latest-wins sender: overflow collapses into one pending snapshot.
struct ProgressSender {
    tx: SyncSender<DownloadProgress>,
    pending: Option<DownloadProgress>,
}

impl ProgressSender {
    fn new(tx: SyncSender<DownloadProgress>) -> Self {
        Self { tx, pending: None }
    }

    fn offer(&mut self, progress: &DownloadProgress) {
        if let Some(older) = self.pending.take() {
            if let Err(TrySendError::Full(_)) = self.tx.try_send(older) {
                self.pending = Some(progress.clone());
                return;
            }
        }
        if let Err(TrySendError::Full(progress)) = self.tx.try_send(progress.clone()) {
            self.pending = Some(progress);
        }
    }

    /// Deliver the held-back snapshot, waiting for room. Returns at once if
    /// the receiver is gone.
    fn finish(mut self) {
        if let Some(last) = self.pending.take() {
            self.tx.send(last).ok();
        }
    }
}

/// Handle to a transfer running on a worker thread.
#[derive(Debug)]
pub struct DownloadHandle {
    progress: Receiver<DownloadProgress>,
    cancel: CancelToken,
    worker: JoinHandle<DownloadResult<DownloadOutcome>>,
}

impl DownloadHandle {
    /// Progress events in the order they were produced.
    ///
    /// Intermediate events are dropped when the consumer falls more than
    /// [`PROGRESS_QUEUE_CAPACITY`] behind. The channel closes when the worker
    /// finishes, so iterating it blocks until the transfer ends.
    pub fn progress(&self) -> &Receiver<DownloadProgress> {
        &self.progress
    }

    /// Ask the worker to stop at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this transfer, e.g. for a signal handler.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the transfer to end. Undelivered progress is discarded.
    pub fn join(self) -> DownloadResult<DownloadOutcome> {
        let Self {
            progress, worker, ..
        } = self;
        // Unblocks a worker waiting to deliver its final snapshot.
        drop(progress);
        worker.join().map_err(|_| DownloadError::WorkerPanicked)?
    }
}

impl Downloader {
    /// Run [`Downloader::fetch`] on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        &self,
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
    ) -> DownloadResult<DownloadHandle> {
        let url = url.into();
        let dest = dest.into();
        let downloader = self.clone();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::sync_channel(PROGRESS_QUEUE_CAPACITY);

        let worker = thread::Builder::new()
            .name("romfetch-download".to_string())
            .spawn(move || {
                let mut sender = ProgressSender::new(tx);
                let result =
                    downloader.fetch(&url, &dest, &worker_cancel, |progress| sender.offer(progress));
                sender.finish();
                result
            })
            .map_err(DownloadError::Spawn)?;

        Ok(DownloadHandle {
            progress: rx,
            cancel,
            worker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadConfig;
    use crate::http::mock::MockHttpClient;
    use std::fs;
    use tempfile::TempDir;

    const URL: &str = "https://files.example.com/game.zip";

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_spawned_download_reports_over_channel() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("game.zip");
        let data = vec![42u8; 4096];
        let client = Arc::new(MockHttpClient::new().serve(URL, data.clone()));
        let downloader =
            Downloader::with_config(client, DownloadConfig::default().with_chunk_size(1024));

        let handle = downloader.spawn(URL, dest.clone()).unwrap();
        let events: Vec<DownloadProgress> = handle.progress().iter().collect();
        let outcome = handle.join().unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Completed {
                path: dest.clone(),
                bytes: 4096
            }
        );
        assert_eq!(events.len(), 4);
        assert!(events.last().unwrap().is_complete());
        assert_eq!(fs::read(&dest).unwrap(), data);
    }

    fn snapshot(bytes: u64) -> DownloadProgress {
        DownloadProgress {
            bytes_downloaded: bytes,
            total_bytes: Some(500),
            resumed_from: 0,
            elapsed: std::time::Duration::from_millis(bytes),
        }
    }

    #[test]
    fn test_full_queue_keeps_only_newest_snapshot() {
        let (tx, rx) = mpsc::sync_channel(2);
        let mut sender = ProgressSender::new(tx);
        for bytes in [100, 200, 300, 400, 500] {
            sender.offer(&snapshot(bytes));
        }

        let first: Vec<u64> = rx.try_iter().map(|p| p.bytes_downloaded).collect();
        assert_eq!(first, vec![100, 200]);

        sender.finish();
        let rest: Vec<u64> = rx.iter().map(|p| p.bytes_downloaded).collect();
        assert_eq!(rest, vec![500]);
    }

    #[test]
    fn test_pending_snapshot_is_sent_before_newer_ones() {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut sender = ProgressSender::new(tx);
        sender.offer(&snapshot(100));
        sender.offer(&snapshot(200));
        assert_eq!(rx.try_recv().unwrap().bytes_downloaded, 100);

        sender.offer(&snapshot(300));
        assert_eq!(rx.try_recv().unwrap().bytes_downloaded, 200);
        sender.finish();
        assert_eq!(rx.recv().unwrap().bytes_downloaded, 300);
    }

    #[test]
    fn test_undrained_progress_does_not_block_join() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("game.zip");
        let chunks = PROGRESS_QUEUE_CAPACITY * 4;
        let data = vec![9u8; chunks * 16];
        let client = Arc::new(MockHttpClient::new().serve(URL, data.clone()));
        let downloader =
            Downloader::with_config(client, DownloadConfig::default().with_chunk_size(16));

        let handle = downloader.spawn(URL, dest.clone()).unwrap();
        let outcome = handle.join().unwrap();

        assert!(matches!(outcome, DownloadOutcome::Completed { .. }));
        assert_eq!(fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn test_slow_consumer_still_sees_completion() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("game.zip");
        let chunks = PROGRESS_QUEUE_CAPACITY * 4;
        let data = vec![9u8; chunks * 16];
        let client = Arc::new(MockHttpClient::new().serve(URL, data.clone()));
        let downloader =
            Downloader::with_config(client, DownloadConfig::default().with_chunk_size(16));

        let handle = downloader.spawn(URL, dest.clone()).unwrap();
        // Let the worker run ahead of the consumer.
        thread::sleep(std::time::Duration::from_millis(50));
        let events: Vec<DownloadProgress> = handle.progress().iter().collect();
        handle.join().unwrap();

        assert!(events.len() <= chunks);
        assert!(events
            .windows(2)
            .all(|w| w[0].bytes_downloaded <= w[1].bytes_downloaded));
        assert!(events.last().unwrap().is_complete());
    }

    #[test]
    fn test_cancelled_before_first_chunk_keeps_partial() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("game.zip");
        let data = vec![42u8; 4096];
        fs::write(&dest, &data[..1000]).unwrap();
        let client = Arc::new(MockHttpClient::new().serve(URL, data));
        let downloader = Downloader::new(client);

        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = downloader.fetch(URL, &dest, &cancel, |_| {}).unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Cancelled {
                bytes_on_disk: 1000
            }
        );
        assert_eq!(fs::metadata(&dest).unwrap().len(), 1000);
    }
}
