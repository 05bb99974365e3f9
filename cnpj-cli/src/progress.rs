//! Terminal progress bars for archive downloads.

use std::{collections::HashMap, sync::Mutex};

use cnpj_data::retrieval::{
    ArchiveRef, DownloadProgress, DownloadReport, ProgressReporter, RetrievalError,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};

const BAR_TEMPLATE: &str =
    "{prefix:>24} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}";
const SPINNER_TEMPLATE: &str = "{prefix:>24} {spinner:.cyan} {bytes} ({bytes_per_sec}) {msg}";

/// Draws one bar per archive under a shared [`MultiProgress`].
///
/// Archives whose size the server does not declare get a spinner instead of
/// a bar. Bars are keyed by local file name and replaced on every attempt.
#[derive(Debug, Default)]
pub struct IndicatifProgress {
    bars: MultiProgress,
    active: Mutex<HashMap<String, ProgressBar>>,
}

impl IndicatifProgress {
    /// Reporter drawing to standard error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn new_bar(
        &self,
        archive: &ArchiveRef,
        attempt: u32,
        declared_len: Option<u64>,
    ) -> ProgressBar {
        let bar = match declared_len {
            Some(total) => ProgressBar::new(total).with_style(style(BAR_TEMPLATE)),
            None => ProgressBar::new_spinner().with_style(style(SPINNER_TEMPLATE)),
        };
        bar.set_prefix(archive.local_name.clone());
        if attempt > 1 {
            bar.set_message(format!("attempt {attempt}"));
        }
        self.bars.add(bar)
    }

    fn with_bar(&self, archive: &ArchiveRef, update: impl FnOnce(&ProgressBar)) {
        if let Ok(active) = self.active.lock()
            && let Some(bar) = active.get(&archive.local_name)
        {
            update(bar);
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|built| built.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ProgressReporter for IndicatifProgress {
    fn started(&self, archive: &ArchiveRef, attempt: u32, declared_len: Option<u64>) {
        let bar = self.new_bar(archive, attempt, declared_len);
        if let Ok(mut active) = self.active.lock()
            && let Some(previous) = active.insert(archive.local_name.clone(), bar)
        {
            previous.finish_and_clear();
            self.bars.remove(&previous);
        }
    }

    fn advanced(&self, archive: &ArchiveRef, progress: &DownloadProgress) {
        self.with_bar(archive, |bar| bar.set_position(progress.bytes_written));
    }

    fn finished(&self, archive: &ArchiveRef, outcome: Result<&DownloadReport, &RetrievalError>) {
        let bar = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.remove(&archive.local_name));
        match outcome {
            Ok(report) => {
                if let Some(done) = bar {
                    done.finish_with_message("done");
                }
                info!(
                    "downloaded {} ({} bytes, {} attempts)",
                    report.output_path, report.bytes_written, report.attempts
                );
            }
            Err(err) => {
                if let Some(failed) = bar {
                    failed.abandon_with_message("failed");
                }
                warn!("download of {} failed: {err}", archive.local_name);
            }
        }
    }
}
