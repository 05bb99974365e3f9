//! Facade crate for the CNPJ open-data loader.
//!
//! This crate re-exports the record model and the retrieval and loading
//! pipeline, and exposes the SQLite store behind a feature flag.

#![forbid(unsafe_code)]

pub use cnpj_core::{
    EntityKind, RecordSchema, RecordSink, RecordStore, RowIntegrityError, RowTransformer,
    SinkError, TypedRecord, Value,
};

#[cfg(feature = "store-sqlite")]
pub use cnpj_core::{SqliteStore, SqliteStoreError};

pub use cnpj_data::{
    ArchiveReader, ArchiveRef, ChunkedLoader, DiscoverySettings, HttpArchiveSource, JobOutcome,
    LoadJob, LoadReport, LoadSettings, RetrievalSettings, fetch_all, fetch_archive, list_archives,
    resolve_jobs, run_jobs,
};
