//! HTTP client for the photos endpoint.

use std::time::Duration;

use async_trait::async_trait;
use pagefeed_core::{FeedError, FeedResult, PageRecord};
use serde::Serialize;

use crate::config::{ConfigError, FeedConfig};
use crate::credential::ApiCredential;
use crate::wire;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One page request: feed category, one-based page number, page size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FeedRequest {
    pub feature: String,
    pub page: usize,
    pub page_size: u32,
}

impl FeedRequest {
    /// Request for the zero-based page `index`.
    pub fn for_index(feature: &str, index: usize, page_size: u32) -> Self {
        Self {
            feature: feature.to_string(),
            page: index + 1,
            page_size,
        }
    }

    /// Zero-based index this request targets.
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1)
    }
}

/// A single request/response exchange with the feed.
///
/// Implementations do no caching and no retries. Every failure is reported
/// as a [`FeedError`].
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_page(&self, request: &FeedRequest) -> FeedResult<PageRecord>;
}

/// [`FeedClient`] over HTTPS using reqwest.
pub struct RestFeedClient {
    client: reqwest::Client,
    base_url: String,
    credential: Option<ApiCredential>,
}

impl RestFeedClient {
    /// Build a client. With `credential = None` every fetch fails fast with
    /// `MissingCredential` and no request is sent.
    pub fn new(config: &FeedConfig, credential: Option<ApiCredential>) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    fn photos_url(&self) -> String {
        format!("{}/v1/photos", self.base_url)
    }
}

#[async_trait]
impl FeedClient for RestFeedClient {
    async fn fetch_page(&self, request: &FeedRequest) -> FeedResult<PageRecord> {
        let Some(credential) = &self.credential else {
            return Err(FeedError::missing_credential());
        };

        let page = request.page.to_string();
        let page_size = request.page_size.to_string();
        let query = [
            ("feature", request.feature.as_str()),
            ("page", page.as_str()),
            ("rpp", page_size.as_str()),
            ("consumer_key", credential.expose()),
        ];

        // without_url: the query string carries the consumer key
        let response = self
            .client
            .get(self.photos_url())
            .query(&query)
            .send()
            .await
            .map_err(|err| FeedError::transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedError::http_status(status.as_u16(), text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FeedError::transport(err.without_url().to_string()))?;
        wire::decode_page(&body)
    }
}

impl std::fmt::Debug for RestFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestFeedClient")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .finish()
    }
}
