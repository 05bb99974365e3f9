//! Chunked loading of typed records into a [`RecordSink`].
//!
//! Records are buffered and written in batches of `chunk_size`. A batch the
//! sink refuses is rolled back and replayed one record at a time so a single
//! bad row costs one record rather than the whole chunk.
#![forbid(unsafe_code)]

use std::ops::AddAssign;

use cnpj_core::{RecordSchema, RecordSink, SinkError, TypedRecord};
use log::{debug, warn};
use thiserror::Error;

/// Records buffered before a batch is written.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Counters accumulated while loading.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records committed to the sink.
    pub rows_loaded: u64,
    /// Records rejected during row-by-row fallback.
    pub rows_skipped: u64,
    /// Buffers flushed, whether in bulk or row by row.
    pub batches_flushed: u64,
    /// Buffers that needed the row-by-row fallback.
    pub fallback_batches: u64,
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, other: Self) {
        self.rows_loaded = self.rows_loaded.saturating_add(other.rows_loaded);
        self.rows_skipped = self.rows_skipped.saturating_add(other.rows_skipped);
        self.batches_flushed = self.batches_flushed.saturating_add(other.batches_flushed);
        self.fallback_batches = self.fallback_batches.saturating_add(other.fallback_batches);
    }
}

/// Failure that leaves the sink unusable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// Rolling back a failed write failed too.
    #[error("rollback on table {table} failed: {source}")]
    Rollback {
        /// Table being loaded.
        table: &'static str,
        /// Sink error raised by the rollback.
        #[source]
        source: SinkError,
    },
}

/// Buffering writer for one table.
///
/// # Examples
/// ```
/// # use cnpj_core::{EntityKind, RowTransformer};
/// # use cnpj_core::test_support::MemoryStore;
/// # use cnpj_core::RecordStore;
/// # use cnpj_data::loader::ChunkedLoader;
/// let store = MemoryStore::single_writer();
/// let mut sink = store.open_sink().expect("memory sinks always open");
/// let transformer = RowTransformer::for_kind(EntityKind::Pais);
/// let mut loader = ChunkedLoader::new(&mut sink, transformer.schema(), 2);
/// for (index, name) in ["BRASIL", "CHILE", "PERU"].into_iter().enumerate() {
///     let code = (index + 100).to_string();
///     let record = transformer
///         .transform("Paises.zip", 0, &[code.as_str(), name])
///         .expect("two fields");
///     loader.push(record).expect("memory store never fails rollback");
/// }
/// let report = loader.finish().expect("flush remainder");
/// assert_eq!(report.rows_loaded, 3);
/// assert_eq!(report.batches_flushed, 2);
/// ```
pub struct ChunkedLoader<'s, S: RecordSink + ?Sized> {
    sink: &'s mut S,
    schema: &'static RecordSchema,
    chunk_size: usize,
    buffer: Vec<TypedRecord>,
    report: LoadReport,
}

impl<S: RecordSink + ?Sized> std::fmt::Debug for ChunkedLoader<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedLoader")
            .field("table", &self.schema.table)
            .field("chunk_size", &self.chunk_size)
            .field("buffered", &self.buffer.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<'s, S: RecordSink + ?Sized> ChunkedLoader<'s, S> {
    /// Load into `schema`'s table through `sink`. A zero chunk size is raised
    /// to one.
    pub fn new(sink: &'s mut S, schema: &'static RecordSchema, chunk_size: usize) -> Self {
        let effective = chunk_size.max(1);
        Self {
            sink,
            schema,
            chunk_size: effective,
            buffer: Vec::with_capacity(effective.min(DEFAULT_CHUNK_SIZE)),
            report: LoadReport::default(),
        }
    }

    /// Buffer `record`, flushing when the buffer reaches the chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when a rollback fails during the flush.
    pub fn push(&mut self, record: TypedRecord) -> Result<(), LoadError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Counters so far, excluding records still buffered.
    #[must_use]
    pub const fn report(&self) -> LoadReport {
        self.report
    }

    /// Flush what remains and return the final counters.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when a rollback fails during the flush.
    pub fn finish(mut self) -> Result<LoadReport, LoadError> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        Ok(self.report)
    }

    fn flush(&mut self) -> Result<(), LoadError> {
        let table = self.schema.table;
        let size = self.buffer.len();
        let bulk = self
            .sink
            .insert_batch(self.schema, &self.buffer)
            .and_then(|()| self.sink.commit());
        match bulk {
            Ok(()) => {
                debug!("{table}: flushed {size} records");
                self.report.rows_loaded = self.report.rows_loaded.saturating_add(count(size));
            }
            Err(err) => {
                warn!("{table}: batch of {size} records failed ({err}); inserting one by one");
                self.rollback()?;
                self.report.fallback_batches = self.report.fallback_batches.saturating_add(1);
                self.insert_individually()?;
            }
        }
        self.report.batches_flushed = self.report.batches_flushed.saturating_add(1);
        self.buffer.clear();
        Ok(())
    }

    fn insert_individually(&mut self) -> Result<(), LoadError> {
        let table = self.schema.table;
        for record in &self.buffer {
            let single = self
                .sink
                .insert_one(self.schema, record)
                .and_then(|()| self.sink.commit());
            match single {
                Ok(()) => self.report.rows_loaded = self.report.rows_loaded.saturating_add(1),
                Err(err) => {
                    warn!("{table}: skipping record {record:?}: {err}");
                    self.sink.rollback().map_err(|source| LoadError::Rollback { table, source })?;
                    self.report.rows_skipped = self.report.rows_skipped.saturating_add(1);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), LoadError> {
        let table = self.schema.table;
        self.sink
            .rollback()
            .map_err(|source| LoadError::Rollback { table, source })
    }
}

fn count(size: usize) -> u64 {
    u64::try_from(size).unwrap_or(u64::MAX)
}

/// Load every record of `records` through `sink` in chunks.
///
/// # Errors
///
/// Returns [`LoadError`] when the sink cannot roll back a failed write.
pub fn load<S, I>(
    sink: &mut S,
    schema: &'static RecordSchema,
    chunk_size: usize,
    records: I,
) -> Result<LoadReport, LoadError>
where
    S: RecordSink + ?Sized,
    I: IntoIterator<Item = TypedRecord>,
{
    let mut loader = ChunkedLoader::new(sink, schema, chunk_size);
    for record in records {
        loader.push(record)?;
    }
    loader.finish()
}
