//! `download` command.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use romfetch::config::format_size;
use romfetch::download::{DownloadOutcome, DownloadProgress};

use super::load_context;
use crate::error::CliError;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}";

/// Download `url` to `dest` with a progress bar. Ctrl-C stops the transfer
/// and keeps the partial file for a later resume.
pub fn run(url: &str, dest: &Path) -> Result<(), CliError> {
    let ctx = load_context()?;
    let handle = ctx.downloader().spawn(url, dest)?;

    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).map_err(|e| CliError::Signal(e.to_string()))?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    for progress in handle.progress().iter() {
        if let Some(total) = progress.total_bytes {
            bar.set_length(total);
        }
        bar.set_position(progress.bytes_downloaded);
        bar.set_message(status_line(&progress));
    }

    let outcome = handle.join();
    bar.finish_and_clear();

    match outcome? {
        DownloadOutcome::Completed { path, bytes } => {
            println!("Downloaded {} ({})", path.display(), format_size(bytes));
        }
        DownloadOutcome::Cancelled { bytes_on_disk } => {
            println!(
                "Cancelled. Kept {} at {}; run the same command to resume.",
                format_size(bytes_on_disk),
                dest.display()
            );
        }
    }
    Ok(())
}

/// Throughput and ETA for the bar message.
fn status_line(progress: &DownloadProgress) -> String {
    let rate = format!("{}/s", format_size(progress.throughput() as u64));
    match progress.eta() {
        Some(eta) => format!("{} ETA {}", rate, format_duration(eta)),
        None => rate,
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 7 * 60)), "3h07m");
    }

    #[test]
    fn test_status_line() {
        let progress = DownloadProgress {
            bytes_downloaded: 3072,
            total_bytes: Some(5120),
            resumed_from: 1024,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(status_line(&progress), "1.0 KB/s ETA 2s");

        let unknown = DownloadProgress {
            total_bytes: None,
            ..progress
        };
        assert_eq!(status_line(&unknown), "1.0 KB/s");
    }
}
