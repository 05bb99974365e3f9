//! Download progress observers.
//!
//! Progress is purely observational: reporters never influence retries or
//! verification.

use std::time::Duration;

use log::{info, trace, warn};

use super::{ArchiveRef, DownloadReport, RetrievalError};

/// Cumulative state of the current attempt after a block was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Bytes written so far in this attempt.
    pub bytes_written: u64,
    /// Length announced by the server.
    pub bytes_expected: Option<u64>,
    /// Time since the attempt started.
    pub elapsed: Duration,
}

impl DownloadProgress {
    /// Whole percentage of the declared length written so far.
    #[must_use]
    #[expect(
        clippy::integer_division,
        reason = "progress only needs whole percentages"
    )]
    pub fn percent(&self) -> Option<u64> {
        self.bytes_expected
            .filter(|total| *total > 0)
            .map(|total| self.bytes_written.saturating_mul(100) / total)
    }

    /// Average throughput of the attempt in megabits per second.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "throughput is an approximate display value"
    )]
    pub fn megabits_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return None;
        }
        Some(self.bytes_written as f64 * 8.0 / 1_000_000.0 / seconds)
    }
}

/// Observer notified while archives download.
pub trait ProgressReporter {
    /// An attempt is about to stream its body.
    fn started(&self, _archive: &ArchiveRef, _attempt: u32, _declared_len: Option<u64>) {}

    /// A block was written to disk.
    fn advanced(&self, archive: &ArchiveRef, progress: &DownloadProgress);

    /// The archive finished, successfully or not.
    fn finished(&self, _archive: &ArchiveRef, _outcome: Result<&DownloadReport, &RetrievalError>) {}
}

/// Reporter that forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn started(&self, archive: &ArchiveRef, attempt: u32, declared_len: Option<u64>) {
        let size = declared_len.map_or_else(|| "unknown size".to_owned(), |len| format!("{len} bytes"));
        info!(
            "[{}] downloading {} ({size}), attempt {attempt}",
            archive.entity_kind.label(),
            archive.local_name
        );
    }

    fn advanced(&self, archive: &ArchiveRef, progress: &DownloadProgress) {
        trace!(
            "[{}] {}: {} bytes, {}%, {:.2} Mbps",
            archive.entity_kind.label(),
            archive.local_name,
            progress.bytes_written,
            progress.percent().unwrap_or_default(),
            progress.megabits_per_second().unwrap_or_default()
        );
    }

    fn finished(&self, archive: &ArchiveRef, outcome: Result<&DownloadReport, &RetrievalError>) {
        let label = archive.entity_kind.label();
        match outcome {
            Ok(report) => info!(
                "[{label}] {} downloaded: {} bytes",
                archive.local_name, report.bytes_written
            ),
            Err(err) => warn!("[{label}] {} not downloaded: {err}", archive.local_name),
        }
    }
}

/// Reporter that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advanced(&self, _archive: &ArchiveRef, _progress: &DownloadProgress) {}
}
