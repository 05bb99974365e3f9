//! In-memory publisher used by retrieval and discovery tests.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use tokio::runtime::Builder;

use super::source::{ArchiveBody, ArchiveSource};
use super::{ArchiveUrl, BaseUrl, TransportError};

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics when the Tokio runtime cannot be built.
#[must_use]
pub fn block_on_for_tests<F>(future: F) -> F::Output
where
    F: Future,
{
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build Tokio runtime: {err}"));
    runtime.block_on(future)
}

#[derive(Debug, Clone)]
struct StubArchive {
    bytes: Vec<u8>,
    declared_len: Option<u64>,
    truncated_attempts: u32,
}

/// Stub [`ArchiveSource`] serving an index page and archives from memory.
///
/// Archives can be made to arrive truncated for a number of attempts so the
/// retry loop can be observed without a network.
#[derive(Debug, Default)]
pub struct StubSource {
    base_url: BaseUrl,
    index: Option<String>,
    index_failures: Cell<u32>,
    archives: HashMap<String, StubArchive>,
    index_requests: Cell<u32>,
    archive_requests: RefCell<HashMap<String, u32>>,
    watched_partial: Option<Utf8PathBuf>,
    partial_seen: RefCell<Vec<bool>>,
}

impl StubSource {
    /// Construct an empty stub rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: BaseUrl::new(base_url),
            ..Self::default()
        }
    }

    /// Serve `html` as the index page.
    #[must_use]
    pub fn with_index(mut self, html: impl Into<String>) -> Self {
        self.index = Some(html.into());
        self
    }

    /// Fail the first `failures` index requests with a network error.
    #[must_use]
    pub fn with_index_failures(self, failures: u32) -> Self {
        self.index_failures.set(failures);
        self
    }

    /// Serve `bytes` at `url`, declaring their exact length.
    #[must_use]
    pub fn with_archive(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        let declared_len = u64::try_from(bytes.len()).ok();
        self.archives.insert(
            url.into(),
            StubArchive {
                bytes,
                declared_len,
                truncated_attempts: 0,
            },
        );
        self
    }

    /// Serve `bytes` at `url` without a declared length.
    #[must_use]
    pub fn with_undeclared_archive(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.archives.insert(
            url.into(),
            StubArchive {
                bytes,
                declared_len: None,
                truncated_attempts: 0,
            },
        );
        self
    }

    /// Cut the body of `url` in half for its first `attempts` requests while
    /// still declaring the full length.
    #[must_use]
    pub fn truncating(mut self, url: &str, attempts: u32) -> Self {
        if let Some(archive) = self.archives.get_mut(url) {
            archive.truncated_attempts = attempts;
        }
        self
    }

    /// Record, at every archive request, whether `path` exists on disk.
    #[must_use]
    pub fn watching_partial(mut self, path: Utf8PathBuf) -> Self {
        self.watched_partial = Some(path);
        self
    }

    /// Number of index requests served so far.
    #[must_use]
    pub fn index_requests(&self) -> u32 {
        self.index_requests.get()
    }

    /// Number of requests issued for `url`.
    #[must_use]
    pub fn archive_requests(&self, url: &str) -> u32 {
        self.archive_requests.borrow().get(url).copied().unwrap_or(0)
    }

    /// Existence of the watched file observed at each archive request.
    #[must_use]
    pub fn partial_seen(&self) -> Vec<bool> {
        self.partial_seen.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ArchiveSource for StubSource {
    fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    async fn fetch_index(&self) -> Result<String, TransportError> {
        self.index_requests.set(self.index_requests.get().saturating_add(1));
        let remaining = self.index_failures.get();
        if remaining > 0 {
            self.index_failures.set(remaining.saturating_sub(1));
            return Err(TransportError::Network {
                url: self.base_url.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by stub"),
            });
        }
        self.index.clone().ok_or_else(|| TransportError::Http {
            url: self.base_url.to_string(),
            status: 404,
            message: "no index configured".to_owned(),
        })
    }

    async fn open_archive(&self, url: &ArchiveUrl) -> Result<ArchiveBody, TransportError> {
        if let Some(path) = &self.watched_partial {
            self.partial_seen.borrow_mut().push(path.exists());
        }
        let served = {
            let mut requests = self.archive_requests.borrow_mut();
            let count = requests.entry(url.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        let archive = self.archives.get(url.as_ref()).ok_or_else(|| TransportError::Http {
            url: url.to_string(),
            status: 404,
            message: "not found".to_owned(),
        })?;
        let body: Vec<u8> = if served <= archive.truncated_attempts {
            let half = archive.bytes.len() >> 1;
            archive.bytes.iter().take(half).copied().collect()
        } else {
            archive.bytes.clone()
        };
        Ok(ArchiveBody {
            declared_len: archive.declared_len,
            reader: Box::pin(Cursor::new(body)),
        })
    }
}
