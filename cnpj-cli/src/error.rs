//! Error types emitted by the CNPJ CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::{io, sync::Arc};

use camino::Utf8PathBuf;
use cnpj_core::{SqliteStoreError, UnknownEntityKind};
use cnpj_data::{ArchiveError, DiscoveryError, JobError, retrieval::TransportError};
use thiserror::Error;

/// Errors emitted by the CNPJ CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The kinds list named an unknown entity kind.
    #[error("invalid --kinds value: {0}")]
    UnknownEntityKind(#[from] UnknownEntityKind),
    /// The configured text encoding is not supported.
    #[error("invalid --encoding value: {0}")]
    Encoding(#[source] ArchiveError),
    /// The async runtime used for downloads could not start.
    #[error("failed to start the download runtime: {0}")]
    Runtime(#[source] io::Error),
    /// The HTTP client could not be built.
    #[error("failed to prepare the archive source: {0}")]
    Source(#[source] TransportError),
    /// The archive index could not be read.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// The database could not be prepared.
    #[error("failed to prepare database {path:?}: {source}")]
    OpenStore {
        /// Database file.
        path: Utf8PathBuf,
        /// Store error.
        #[source]
        source: SqliteStoreError,
    },
    /// The archive directory could not be scanned.
    #[error(transparent)]
    ResolveJobs(#[from] JobError),
    /// Some downloads or load jobs failed; the details were logged.
    #[error("import incomplete: {failed_downloads} downloads and {failed_jobs} load jobs failed")]
    Incomplete {
        /// Archives that could not be downloaded.
        failed_downloads: usize,
        /// Entity kinds whose load job failed.
        failed_jobs: usize,
    },
}
