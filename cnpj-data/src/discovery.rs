//! Discovery of the archives listed on the publisher's index page.
//!
//! The index is plain HTML; links are recovered with an attribute scan rather
//! than a full parser, then matched against the entity catalog.

use std::sync::LazyLock;
use std::time::Duration;

use cnpj_core::EntityKind;
use log::{info, warn};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::retrieval::{
    ArchiveRef, ArchiveSource, MAX_RETRY, RETRY_DELAY, TransportError, pause,
};

#[expect(clippy::expect_used, reason = "the pattern is a checked literal")]
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href=['"]?([^'" >]+)"#).expect("href pattern should compile")
});

/// Errors raised while building the work list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// The index page could not be fetched within the attempt budget.
    #[error("index {url} unavailable after {attempts} attempts: {source}")]
    Unavailable {
        /// Index page URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Last transport error observed.
        #[source]
        source: TransportError,
    },
    /// The configured base URL is not a valid absolute URL.
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        /// Offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

/// Retry policy for fetching the index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Attempts made before giving up; at least 1.
    pub max_retry: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl DiscoverySettings {
    /// Override the attempt budget. Zero is raised to one.
    #[must_use]
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Override the pause between attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Fetch the index page and return the archives for `kinds`.
///
/// Archives are grouped by entity kind in catalog order; within a kind they
/// are sorted by file name so multi-part releases load deterministically.
/// `kinds` only filters: its order does not matter.
///
/// # Errors
///
/// Returns [`DiscoveryError::Unavailable`] once `settings.max_retry` index
/// requests have failed and [`DiscoveryError::InvalidBaseUrl`] when the
/// source's base URL does not parse.
pub async fn list_archives<S>(
    source: &S,
    settings: &DiscoverySettings,
    kinds: &[EntityKind],
) -> Result<Vec<ArchiveRef>, DiscoveryError>
where
    S: ArchiveSource + ?Sized,
{
    let base_url = source.base_url();
    let base = Url::parse(base_url).map_err(|source| DiscoveryError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })?;
    let html = fetch_index_with_retries(source, settings).await?;
    let links = scan_archive_links(&html);
    let archives = select_archives(&base, &links, kinds);
    info!(
        "found {} archives ({} links) at {base_url}",
        archives.len(),
        links.len()
    );
    Ok(archives)
}

async fn fetch_index_with_retries<S>(
    source: &S,
    settings: &DiscoverySettings,
) -> Result<String, DiscoveryError>
where
    S: ArchiveSource + ?Sized,
{
    let max_retry = settings.max_retry.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match source.fetch_index().await {
            Ok(html) => return Ok(html),
            Err(err) if attempt >= max_retry => {
                return Err(DiscoveryError::Unavailable {
                    url: source.base_url().to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                warn!("index attempt {attempt}/{max_retry} failed: {err}");
                pause(settings.retry_delay).await;
            }
        }
    }
}

/// Extract every `.zip` link target from `html`, first occurrence first.
pub(crate) fn scan_archive_links(html: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for captures in HREF.captures_iter(html) {
        let Some(target) = captures.get(1).map(|found| found.as_str()) else {
            continue;
        };
        if !has_zip_extension(target) || links.iter().any(|known| known == target) {
            continue;
        }
        links.push(target.to_owned());
    }
    links
}

fn has_zip_extension(target: &str) -> bool {
    target
        .rsplit_once('.')
        .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("zip"))
}

/// Resolve `links` against `base` and keep those belonging to `kinds`.
pub(crate) fn select_archives(base: &Url, links: &[String], kinds: &[EntityKind]) -> Vec<ArchiveRef> {
    let resolved: Vec<Url> = links
        .iter()
        .filter_map(|link| match base.join(link) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("skipping unusable link {link}: {err}");
                None
            }
        })
        .collect();

    let mut selected = Vec::new();
    for kind in EntityKind::ALL.iter().copied().filter(|kind| kinds.contains(kind)) {
        let mut matching: Vec<ArchiveRef> = resolved
            .iter()
            .filter_map(|url| ArchiveRef::from_url(url.clone(), kind))
            .filter(|archive| kind.matches_archive(&archive.local_name))
            .collect();
        matching.sort_by(|left, right| left.local_name.cmp(&right.local_name));
        selected.extend(matching);
    }
    selected
}
