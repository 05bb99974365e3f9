use std::{io, pin::Pin, time::Duration};

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use super::util::sanitise_base_url;
use super::{ArchiveUrl, BaseUrl, TransportError};

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "cnpj-loader/0.1";

/// Index page published by the Federal Revenue.
pub const DEFAULT_BASE_URL: &str = "http://200.152.38.155/CNPJ/";

/// Response body of an archive request.
pub struct ArchiveBody {
    /// Length announced by the server, when it sent one.
    pub declared_len: Option<u64>,
    /// Streaming body.
    pub reader: Pin<Box<dyn AsyncRead>>,
}

impl std::fmt::Debug for ArchiveBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBody")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Where the index page and the archives come from.
#[async_trait(?Send)]
pub trait ArchiveSource {
    /// Index page URL.
    fn base_url(&self) -> &BaseUrl;
    /// Fetch the index page as text.
    async fn fetch_index(&self) -> Result<String, TransportError>;
    /// Start streaming the archive at `url`.
    async fn open_archive(&self, url: &ArchiveUrl) -> Result<ArchiveBody, TransportError>;
}

/// HTTP implementation of [`ArchiveSource`].
#[derive(Debug)]
pub struct HttpArchiveSource {
    client: Client,
    base_url: BaseUrl,
    user_agent: String,
}

impl HttpArchiveSource {
    /// Construct an HTTP-backed source for the index at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the TLS backend cannot be
    /// initialised.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| TransportError::Client { source })?;
        Ok(Self {
            client,
            base_url: sanitise_base_url(base_url),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        })
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    async fn call(&self, url: &str, timeout: Option<Duration>) -> Result<Response, TransportError> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str());
        if let Some(limit) = timeout {
            request = request.timeout(limit);
        }
        request
            .send()
            .await
            .map_err(transport_error(url))?
            .error_for_status()
            .map_err(transport_error(url))
    }
}

#[async_trait(?Send)]
impl ArchiveSource for HttpArchiveSource {
    fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    async fn fetch_index(&self) -> Result<String, TransportError> {
        let url: &str = self.base_url.as_ref();
        self.call(url, Some(Duration::from_secs(30)))
            .await?
            .text()
            .await
            .map_err(transport_error(url))
    }

    async fn open_archive(&self, url: &ArchiveUrl) -> Result<ArchiveBody, TransportError> {
        let response = self.call(url, None).await?;
        let declared_len = response.content_length();
        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(ArchiveBody {
            declared_len,
            reader: Box::pin(StreamReader::new(stream)),
        })
    }
}

fn transport_error(url: &str) -> impl Fn(reqwest::Error) -> TransportError + '_ {
    move |error| match error.status() {
        Some(status) => TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        },
        None if error.is_timeout() => TransportError::Network {
            url: url.to_owned(),
            source: io::Error::new(io::ErrorKind::TimedOut, error),
        },
        None => TransportError::Network {
            url: url.to_owned(),
            source: io::Error::other(error),
        },
    }
}
