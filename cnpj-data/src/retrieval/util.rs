//! Shared helpers used by the retrieval operations and sources.

use std::time::Duration;

use super::{BaseUrl, DEFAULT_BASE_URL};

/// Trim whitespace, fall back to the publisher's index, and force a trailing
/// slash so relative links resolve inside the directory.
pub(crate) fn sanitise_base_url(url: impl Into<String>) -> BaseUrl {
    let raw = url.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        BaseUrl::from(DEFAULT_BASE_URL)
    } else if trimmed.ends_with('/') {
        BaseUrl::new(trimmed.to_owned())
    } else {
        BaseUrl::new(format!("{trimmed}/"))
    }
}

/// Sleep between attempts unless the delay is zero.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
