//! Error types produced by archive retrieval.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors produced while downloading one archive.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RetrievalError {
    /// Every attempt failed.
    #[error("giving up on {url} after {attempts} attempts")]
    DownloadExhausted {
        /// Archive URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// Preparing the destination directory failed.
    #[error("failed to create download directory {path:?}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Writing the archive to disk failed.
    #[error("failed to write archive to {path:?}: {source}")]
    WriteArchive {
        /// Destination file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Removing a partial download before retrying failed.
    #[error("failed to remove partial archive {path:?}: {source}")]
    RemovePartial {
        /// Partial file that could not be deleted.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// Builder error.
        source: reqwest::Error,
    },
}

/// Why a single download attempt must be retried.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("received {actual} bytes but the server declared {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}
