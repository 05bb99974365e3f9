//! Per-entity load jobs and their scheduling.
//!
//! A [`LoadJob`] owns the local archives of one entity kind. Running it opens
//! a dedicated sink, streams every archive through the reader, the row
//! transformer, and the chunked loader, and reports what was written. Jobs
//! touch disjoint tables, so they run on scoped threads whenever the store
//! accepts concurrent writers and strictly one after another otherwise.
#![forbid(unsafe_code)]

use std::io;
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use cnpj_core::{
    EntityKind, RecordSchema, RecordSink, RecordStore, RowIntegrityError, RowTransformer,
    SinkError,
};
use log::{error, info};
use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveReader, ReaderSettings};
use crate::loader::{ChunkedLoader, DEFAULT_CHUNK_SIZE, LoadError, LoadReport};

/// Errors that end a load job.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    /// The archive directory could not be listed.
    #[error("failed to list {path} for {entity_kind} archives: {source}")]
    ListDirectory {
        /// Kind whose archives were being resolved.
        entity_kind: EntityKind,
        /// Directory that was listed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An archive could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// A row did not have the expected width.
    #[error(transparent)]
    RowIntegrity(#[from] RowIntegrityError),
    /// The store refused to hand out a sink.
    #[error("failed to open a sink for {entity_kind}: {source}")]
    OpenSink {
        /// Kind of the job.
        entity_kind: EntityKind,
        /// Store error.
        #[source]
        source: SinkError,
    },
    /// The sink became unusable while loading.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The job's thread panicked.
    #[error("load job for {entity_kind} panicked")]
    Panicked {
        /// Kind of the job.
        entity_kind: EntityKind,
    },
}

/// Work unit covering every local archive of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    /// Kind being loaded.
    pub entity_kind: EntityKind,
    /// Target table layout.
    pub schema: &'static RecordSchema,
    /// Archives to load, in load order.
    pub source_files: Vec<Utf8PathBuf>,
}

impl LoadJob {
    /// Job loading `source_files` in the given order.
    #[must_use]
    pub fn new(entity_kind: EntityKind, source_files: Vec<Utf8PathBuf>) -> Self {
        Self {
            entity_kind,
            schema: RecordSchema::for_kind(entity_kind),
            source_files,
        }
    }

    /// Job for the archives of `entity_kind` found directly in `dir`, sorted
    /// by file name.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::ListDirectory`] when `dir` cannot be read.
    pub fn resolve(entity_kind: EntityKind, dir: &Utf8Path) -> Result<Self, JobError> {
        let source_files = cnpj_fs::list_files(dir, |name| entity_kind.matches_archive(name))
            .map_err(|source| JobError::ListDirectory {
                entity_kind,
                path: dir.to_path_buf(),
                source,
            })?;
        Ok(Self::new(entity_kind, source_files))
    }

    /// Field count every row of this job must carry.
    #[must_use]
    pub const fn expected_column_count(&self) -> usize {
        self.schema.column_count()
    }
}

/// Resolve one job per kind in `kinds`, in catalog order.
///
/// # Errors
///
/// Returns [`JobError::ListDirectory`] when `dir` cannot be read.
pub fn resolve_jobs(kinds: &[EntityKind], dir: &Utf8Path) -> Result<Vec<LoadJob>, JobError> {
    EntityKind::ALL
        .into_iter()
        .filter(|kind| kinds.contains(kind))
        .map(|kind| LoadJob::resolve(kind, dir))
        .collect()
}

/// Options applied to every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSettings {
    /// Records per batch.
    pub chunk_size: usize,
    /// Archive decoding.
    pub reader: ReaderSettings,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            reader: ReaderSettings::default(),
        }
    }
}

impl LoadSettings {
    /// Override the batch size. Zero is raised to one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override archive decoding.
    #[must_use]
    pub const fn with_reader(mut self, reader: ReaderSettings) -> Self {
        self.reader = reader;
        self
    }
}

/// Result of a successful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    /// Kind that was loaded.
    pub entity_kind: EntityKind,
    /// Archives processed.
    pub files: usize,
    /// Counters summed over every archive.
    pub load: LoadReport,
}

/// Outcome of one job in a batch run.
#[derive(Debug)]
pub struct JobOutcome {
    /// Kind of the job.
    pub entity_kind: EntityKind,
    /// What happened.
    pub result: Result<JobReport, JobError>,
}

impl JobOutcome {
    /// Whether the job completed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one job to completion on the calling thread.
///
/// Failures are logged with the entity label and archive name before they
/// are returned.
///
/// # Errors
///
/// Returns [`JobError`] when the sink cannot be opened, an archive cannot be
/// read, a row has the wrong width, or the sink becomes unusable. The first
/// failing archive ends the job.
pub fn run_job<S>(job: &LoadJob, store: &S, settings: &LoadSettings) -> Result<JobReport, JobError>
where
    S: RecordStore + ?Sized,
{
    let label = job.entity_kind.label();
    let mut sink = store.open_sink().map_err(|source| {
        error!("[{label}] could not open a sink: {source}");
        JobError::OpenSink {
            entity_kind: job.entity_kind,
            source,
        }
    })?;
    let transformer = RowTransformer::for_kind(job.entity_kind);
    let mut total = LoadReport::default();

    for path in &job.source_files {
        let file_name = path.file_name().unwrap_or(path.as_str());
        info!("[{label}] importing {file_name}");
        let report = load_archive(&mut sink, &transformer, path, file_name, settings)
            .inspect_err(|err| error!("[{label}] {file_name} failed: {err}"))?;
        info!(
            "[{label}] {file_name}: {} rows loaded, {} skipped",
            report.rows_loaded, report.rows_skipped
        );
        total += report;
    }

    info!(
        "[{label}] import complete: {} files, {} rows loaded, {} skipped",
        job.source_files.len(),
        total.rows_loaded,
        total.rows_skipped
    );
    Ok(JobReport {
        entity_kind: job.entity_kind,
        files: job.source_files.len(),
        load: total,
    })
}

fn load_archive<K>(
    sink: &mut K,
    transformer: &RowTransformer,
    path: &Utf8Path,
    file_name: &str,
    settings: &LoadSettings,
) -> Result<LoadReport, JobError>
where
    K: RecordSink + ?Sized,
{
    let mut reader = ArchiveReader::open(path, settings.reader)?;
    let mut loader = ChunkedLoader::new(sink, transformer.schema(), settings.chunk_size);
    reader.for_each_row(|row| -> Result<(), JobError> {
        let record = transformer.transform(file_name, row.index, row.fields.as_slice())?;
        loader.push(record)?;
        Ok(())
    })?;
    loader.finish().map_err(JobError::from)
}

/// Run every job, in parallel when both the caller and the store allow it.
///
/// Jobs never cancel each other: every job runs to its own end and the
/// outcomes come back in the order of `jobs`.
#[must_use]
pub fn run_jobs<S>(
    jobs: &[LoadJob],
    store: &S,
    settings: &LoadSettings,
    concurrency_allowed: bool,
) -> Vec<JobOutcome>
where
    S: RecordStore + ?Sized,
{
    if concurrency_allowed && store.supports_concurrent_writers() {
        info!("running {} load jobs concurrently", jobs.len());
        run_concurrently(jobs, store, settings)
    } else {
        info!("running {} load jobs one at a time", jobs.len());
        jobs.iter()
            .map(|job| JobOutcome {
                entity_kind: job.entity_kind,
                result: run_job(job, store, settings),
            })
            .collect()
    }
}

fn run_concurrently<S>(jobs: &[LoadJob], store: &S, settings: &LoadSettings) -> Vec<JobOutcome>
where
    S: RecordStore + ?Sized,
{
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| {
                let handle = scope.spawn(move || run_job(job, store, settings));
                (job.entity_kind, handle)
            })
            .collect();
        handles
            .into_iter()
            .map(|(entity_kind, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    error!("[{}] load job panicked", entity_kind.label());
                    Err(JobError::Panicked { entity_kind })
                });
                JobOutcome {
                    entity_kind,
                    result,
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests;
