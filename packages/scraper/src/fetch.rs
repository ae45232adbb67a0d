//! Bulletin page retrieval.
//!
//! A single GET per refresh, no retries. Non-200 responses are returned
//! rather than raised so the caller can report the upstream status and
//! body verbatim.

use std::time::Duration;

use async_trait::async_trait;

use crate::ScrapeError;

/// Response of a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`.
    pub status_text: String,
    /// Response body as text.
    pub body: String,
}

impl FetchedPage {
    /// Whether the upstream answered `200 OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Retrieves a page by URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, returning whatever status the server answered with.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if no response could be obtained.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError>;
}

/// [`PageFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with the given user agent and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the client cannot be built.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        log::info!("Fetching bulletin page at {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        log::info!("  HTTP {status}, {} bytes", body.len());

        Ok(FetchedPage {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
