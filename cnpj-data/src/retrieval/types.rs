//! Typed wrappers for publisher URLs, archive references, and download settings.

use std::{fmt, ops::Deref, time::Duration};

use camino::Utf8PathBuf;
use cnpj_core::EntityKind;
use url::Url;

/// Attempts made per archive before giving up.
pub const MAX_RETRY: u32 = 100;

/// Bytes read from the response body per block.
pub const BLOCK_SIZE: usize = 8 * 1024;

/// Pause between attempts against the publisher.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Index page of the publisher, always ending in `/`.
///
/// # Examples
/// ```
/// # use cnpj_data::retrieval::BaseUrl;
/// let url = BaseUrl::new("http://200.152.38.155/CNPJ/");
/// assert_eq!(url.as_ref(), "http://200.152.38.155/CNPJ/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Construct a new [`BaseUrl`] from an owned or borrowed string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Consume the wrapper and return the inner [`String`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for BaseUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for BaseUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified URL of one archive.
///
/// # Examples
/// ```
/// # use cnpj_data::retrieval::ArchiveUrl;
/// let url = ArchiveUrl::new("http://200.152.38.155/CNPJ/Empresas0.zip");
/// assert!(url.ends_with(".zip"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveUrl(String);

impl ArchiveUrl {
    /// Construct a new [`ArchiveUrl`] from an owned or borrowed string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl From<Url> for ArchiveUrl {
    fn from(value: Url) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for ArchiveUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ArchiveUrl {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ArchiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One archive selected for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    /// Absolute download URL.
    pub url: ArchiveUrl,
    /// File name used inside the destination directory.
    pub local_name: String,
    /// Entity kind the archive holds.
    pub entity_kind: EntityKind,
}

impl ArchiveRef {
    /// Build a reference from explicit parts.
    #[must_use]
    pub fn new(url: impl Into<String>, local_name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            url: ArchiveUrl::new(url),
            local_name: local_name.into(),
            entity_kind: kind,
        }
    }

    /// Build a reference named after the last path segment of `url`.
    ///
    /// Returns `None` when the URL has no usable file name.
    #[must_use]
    pub fn from_url(url: Url, kind: EntityKind) -> Option<Self> {
        let local_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())?
            .to_owned();
        Some(Self {
            url: url.into(),
            local_name,
            entity_kind: kind,
        })
    }
}

/// Summary of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// Archive that was fetched.
    pub archive: ArchiveRef,
    /// Bytes written by the successful attempt.
    pub bytes_written: u64,
    /// Attempt number that succeeded, starting at 1.
    pub attempts: u32,
    /// Final location of the archive.
    pub output_path: Utf8PathBuf,
}

/// Knobs for the retry loop.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use cnpj_data::retrieval::RetrievalSettings;
/// let settings = RetrievalSettings::default()
///     .with_max_retry(3)
///     .with_retry_delay(Duration::ZERO);
/// assert_eq!(settings.max_retry, 3);
/// assert_eq!(settings.block_size, 8 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// Attempts made before giving up; at least 1.
    pub max_retry: u32,
    /// Read size per block.
    pub block_size: usize,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            block_size: BLOCK_SIZE,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl RetrievalSettings {
    /// Override the attempt budget. Zero is raised to one.
    #[must_use]
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Override the block size. Zero is raised to one byte.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Override the pause between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}
