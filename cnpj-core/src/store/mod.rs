//! Storage traits for typed records.
//!
//! A [`RecordStore`] is a factory: every load job opens its own
//! [`RecordSink`] and never shares it. The store advertises whether several
//! sinks may write at the same time, which decides whether jobs run in
//! parallel or one after another.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{RecordSchema, TypedRecord};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteSink, SqliteStore, SqliteStoreError};

/// Error reported by a [`RecordSink`] or [`RecordStore`] implementation.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct SinkError {
    /// Operation that failed, such as `"insert batch"`.
    pub operation: &'static str,
    /// Backend error.
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl SinkError {
    /// Wrap a backend error raised while performing `operation`.
    #[must_use]
    pub fn new(operation: &'static str, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Write access to the tables of one store, owned by a single job.
///
/// Inserts are buffered in an open unit of work until [`RecordSink::commit`]
/// or discarded by [`RecordSink::rollback`]. Callers roll back after any
/// failed insert before issuing further writes.
pub trait RecordSink {
    /// Insert every record of `records` into `schema`'s table.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when any record is rejected; none of the batch
    /// should be considered written until a later commit succeeds.
    fn insert_batch(
        &mut self,
        schema: &'static RecordSchema,
        records: &[TypedRecord],
    ) -> Result<(), SinkError>;

    /// Insert a single record into `schema`'s table.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the record is rejected.
    fn insert_one(
        &mut self,
        schema: &'static RecordSchema,
        record: &TypedRecord,
    ) -> Result<(), SinkError>;

    /// Make pending inserts durable.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the backend refuses the commit.
    fn commit(&mut self) -> Result<(), SinkError>;

    /// Discard pending inserts.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the backend cannot roll back, which leaves
    /// the sink unusable.
    fn rollback(&mut self) -> Result<(), SinkError>;
}

/// Factory of [`RecordSink`] handles.
///
/// # Examples
///
/// ```
/// use cnpj_core::{RecordSchema, RecordSink, RecordStore, SinkError, TypedRecord};
///
/// struct Discard;
///
/// impl RecordSink for Discard {
///     fn insert_batch(
///         &mut self,
///         _schema: &'static RecordSchema,
///         _records: &[TypedRecord],
///     ) -> Result<(), SinkError> {
///         Ok(())
///     }
///     fn insert_one(
///         &mut self,
///         _schema: &'static RecordSchema,
///         _record: &TypedRecord,
///     ) -> Result<(), SinkError> {
///         Ok(())
///     }
///     fn commit(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
///     fn rollback(&mut self) -> Result<(), SinkError> {
///         Ok(())
///     }
/// }
///
/// struct DiscardStore;
///
/// impl RecordStore for DiscardStore {
///     type Sink = Discard;
///
///     fn supports_concurrent_writers(&self) -> bool {
///         true
///     }
///
///     fn open_sink(&self) -> Result<Discard, SinkError> {
///         Ok(Discard)
///     }
/// }
///
/// assert!(DiscardStore.open_sink().is_ok());
/// ```
pub trait RecordStore: Sync {
    /// Handle type returned by [`RecordStore::open_sink`].
    type Sink: RecordSink;

    /// Whether several sinks may write concurrently.
    ///
    /// Stores answering `false` force sequential ("singleton") execution.
    fn supports_concurrent_writers(&self) -> bool;

    /// Open a new sink owned exclusively by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the backend cannot be reached.
    fn open_sink(&self) -> Result<Self::Sink, SinkError>;
}
