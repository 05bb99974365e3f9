//! Retrieval and loading pipeline for the CNPJ open-data release.
//!
//! Responsibilities:
//! - Discover the published archives and download them with verified retries.
//! - Stream rows out of ZIP archives without extracting them to disk.
//! - Load typed records into a store in chunks, recovering from bad rows.
//! - Schedule one load job per entity kind, concurrently when the store allows.
//!
//! Boundaries:
//! - Record layouts and coercion rules live in `cnpj-core`.
//! - Storage backends implement the `cnpj-core` store traits; this crate only
//!   drives them.
//!
//! Invariants:
//! - A download either matches its declared size or is retried from byte zero.
//! - A row of the wrong width ends its file and job before reaching the sink.
//! - Sinks are never shared between jobs.

pub mod archive;
pub mod discovery;
pub mod loader;
pub mod orchestrator;
pub mod retrieval;

#[cfg(test)]
mod test_fixtures;

pub use archive::{ArchiveError, ArchiveReader, RawRow, ReaderSettings, tokenize};
pub use discovery::{DiscoveryError, DiscoverySettings, list_archives};
pub use loader::{ChunkedLoader, DEFAULT_CHUNK_SIZE, LoadError, LoadReport, load};
pub use orchestrator::{
    JobError, JobOutcome, JobReport, LoadJob, LoadSettings, resolve_jobs, run_job, run_jobs,
};
pub use retrieval::{
    ArchiveRef, ArchiveSource, DownloadReport, HttpArchiveSource, RetrievalError,
    RetrievalSettings, fetch_all, fetch_archive,
};
