//! Download of published archives with verified, bounded retries.
//!
//! [`fetch_archive`] streams one archive to disk and checks the written size
//! against the length the server declared. [`fetch_all`] runs several of those
//! transfers concurrently on the current task. The transport sits behind
//! [`ArchiveSource`] so tests can serve archives from memory.
#![forbid(unsafe_code)]

mod error;
mod ops;
mod progress;
mod source;
mod types;
mod util;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubSource, block_on_for_tests};

pub use error::{RetrievalError, TransportError};
pub use ops::{fetch_all, fetch_archive};
pub use progress::{DownloadProgress, LogProgress, NoProgress, ProgressReporter};
pub use source::{
    ArchiveBody, ArchiveSource, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpArchiveSource,
};
pub use types::{
    ArchiveRef, ArchiveUrl, BLOCK_SIZE, BaseUrl, DownloadReport, MAX_RETRY, RETRY_DELAY,
    RetrievalSettings,
};
pub(crate) use util::pause;

#[cfg(test)]
mod tests;
