//! Progress snapshots for a single transfer.

use std::time::{Duration, Instant};

/// Point-in-time view of a transfer.
///
/// `bytes_downloaded` counts the whole file, including bytes that were
/// already on disk when the transfer resumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes of the destination file written so far.
    pub bytes_downloaded: u64,
    /// Expected final size, when the server reported a length.
    pub total_bytes: Option<u64>,
    /// Bytes that were already on disk when this session started.
    pub resumed_from: u64,
    /// Time since this session started.
    pub elapsed: Duration,
}

impl DownloadProgress {
    /// Completion percentage in `0.0..=100.0`, if the total is known.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            None => None,
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_downloaded as f64 / total as f64 * 100.0).min(100.0)),
        }
    }

    /// Bytes per second received during this session.
    ///
    /// Resumed bytes are excluded so a resumed transfer does not report an
    /// inflated rate. Zero until any time has elapsed.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_downloaded.saturating_sub(self.resumed_from) as f64 / secs
    }

    /// Estimated time remaining at the current throughput.
    pub fn eta(&self) -> Option<Duration> {
        let remaining = self.total_bytes?.saturating_sub(self.bytes_downloaded);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.throughput();
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// True once the known total has been reached.
    pub fn is_complete(&self) -> bool {
        self.total_bytes == Some(self.bytes_downloaded)
    }
}

/// Creates [`DownloadProgress`] snapshots for one session.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    started: Instant,
    resumed_from: u64,
    total_bytes: Option<u64>,
}

impl ProgressTracker {
    pub fn new(resumed_from: u64, total_bytes: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            resumed_from,
            total_bytes,
        }
    }

    pub fn snapshot(&self, bytes_downloaded: u64) -> DownloadProgress {
        DownloadProgress {
            bytes_downloaded,
            total_bytes: self.total_bytes,
            resumed_from: self.resumed_from,
            elapsed: self.started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(bytes: u64, total: Option<u64>, resumed: u64, secs: u64) -> DownloadProgress {
        DownloadProgress {
            bytes_downloaded: bytes,
            total_bytes: total,
            resumed_from: resumed,
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_percent() {
        assert_eq!(progress(250, Some(1000), 0, 1).percent(), Some(25.0));
        assert_eq!(progress(0, Some(0), 0, 1).percent(), Some(100.0));
        assert_eq!(progress(250, None, 0, 1).percent(), None);
    }

    #[test]
    fn test_throughput_excludes_resumed_bytes() {
        let p = progress(3000, Some(5000), 1000, 2);
        assert_eq!(p.throughput(), 1000.0);
        assert_eq!(progress(10, None, 0, 0).throughput(), 0.0);
    }

    #[test]
    fn test_eta() {
        assert_eq!(
            progress(3000, Some(5000), 1000, 2).eta(),
            Some(Duration::from_secs(2))
        );
        assert_eq!(progress(5000, Some(5000), 0, 0).eta(), Some(Duration::ZERO));
        assert_eq!(progress(0, Some(5000), 0, 0).eta(), None);
        assert_eq!(progress(100, None, 0, 1).eta(), None);
    }

    #[test]
    fn test_is_complete() {
        assert!(progress(5000, Some(5000), 0, 1).is_complete());
        assert!(!progress(4999, Some(5000), 0, 1).is_complete());
        assert!(!progress(5000, None, 0, 1).is_complete());
    }

    #[test]
    fn test_tracker_snapshot() {
        let tracker = ProgressTracker::new(1000, Some(5000));
        let p = tracker.snapshot(2000);
        assert_eq!(p.bytes_downloaded, 2000);
        assert_eq!(p.total_bytes, Some(5000));
        assert_eq!(p.resumed_from, 1000);
    }
}
