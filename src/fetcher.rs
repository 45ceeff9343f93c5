//! Paginated access to the adverse-event search API
//!
//! [`EventSource`] is the seam the harvest loop is written against;
//! [`Fetcher`] is the HTTP implementation backed by `reqwest`.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::query::SearchQuery;
use crate::types::{EventRecord, SearchPage};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};
use url::Url;

/// A paginated source of event records
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Records requested per page
    fn page_size(&self) -> u64;

    /// Fetch the first page
    ///
    /// Returns the first batch and the total number of matching records.
    /// Any non-success response, including 429, is an error here.
    async fn begin(&self) -> Result<(Vec<EventRecord>, u64)>;

    /// Fetch the page starting at `offset`
    ///
    /// # Errors
    ///
    /// - [`Error::RateLimited`] on HTTP 429; the caller should wait and retry
    ///   the same offset
    /// - [`Error::RequestFailed`] on any other non-success status
    async fn next(&self, offset: u64) -> Result<Vec<EventRecord>>;
}

/// HTTP client for the openFDA `drug/event` search endpoint
#[derive(Debug, Clone)]
pub struct Fetcher {
    http_client: reqwest::Client,
    base_url: Url,
    search: String,
    page_size: u64,
}

impl Fetcher {
    /// Create a fetcher for `query` against the endpoint in `api`
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(api: &ApiConfig, query: &SearchQuery) -> Result<Self> {
        let base_url = Url::parse(&api.base_url)?;
        if api.page_size == 0 {
            return Err(Error::config("api.page_size", "must be greater than zero"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .user_agent(api.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            search: query.to_search_string(),
            page_size: api.page_size,
        })
    }

    /// The `search` expression sent with every request
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Request URL for the page at `offset`; the first page carries no `skip`
    pub fn page_url(&self, offset: Option<u64>) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("search", &self.search)
                .append_pair("limit", &self.page_size.to_string());
            if let Some(skip) = offset {
                pairs.append_pair("skip", &skip.to_string());
            }
        }
        url
    }

    async fn get_page(&self, offset: Option<u64>) -> Result<SearchPage> {
        let url = self.page_url(offset);
        debug!(%url, "Requesting page");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let page: SearchPage = serde_json::from_slice(&bytes)?;
        debug!(
            offset = offset.unwrap_or(0),
            records = page.results.len(),
            total = page.total(),
            "Page received"
        );
        Ok(page)
    }
}

#[async_trait]
impl EventSource for Fetcher {
    fn page_size(&self) -> u64 {
        self.page_size
    }

    async fn begin(&self) -> Result<(Vec<EventRecord>, u64)> {
        info!("Making initial request to get total number of records");
        let page = self.get_page(None).await.map_err(|e| match e {
            Error::RateLimited => Error::RequestFailed {
                status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                body: "rate limit exceeded on initial request".to_string(),
            },
            other => other,
        })?;
        let total = page.total();
        Ok((page.results, total))
    }

    async fn next(&self, offset: u64) -> Result<Vec<EventRecord>> {
        Ok(self.get_page(Some(offset)).await?.results)
    }
}
