//! Sienge public API client.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::UpstreamError;
use crate::metrics;

use super::source::RecordSource;
use super::types::{Listing, PageRequest, RecordPage};

/// HTTP client for the Sienge listing endpoints.
#[derive(Debug, Clone)]
pub struct SiengeClient {
    /// HTTP client with auth headers preset.
    http: reqwest::Client,
    /// Supply contracts listing URL.
    contracts_url: String,
    /// Measurements listing URL, when enrichment is configured.
    measurements_url: Option<String>,
}

impl SiengeClient {
    /// Create a client from config.
    ///
    /// The Basic-Auth and content-type headers are attached to every request.
    pub fn new(config: &Config) -> crate::Result<Self> {
        let mut authorization = HeaderValue::from_str(&config.credentials().authorization_header())?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(config.http_pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            contracts_url: config.sienge_api_url.clone(),
            measurements_url: config.sienge_measurements_url.clone(),
        })
    }

    /// Contracts listing URL.
    pub fn contracts_url(&self) -> &str {
        &self.contracts_url
    }

    /// Measurements listing URL, if configured.
    pub fn measurements_url(&self) -> Option<&str> {
        self.measurements_url.as_deref()
    }

    fn url_for(&self, listing: Listing) -> Result<&str, UpstreamError> {
        match listing {
            Listing::Contracts => Ok(&self.contracts_url),
            Listing::Measurements => self
                .measurements_url
                .as_deref()
                .ok_or(UpstreamError::EndpointNotConfigured(listing)),
        }
    }

    /// Fetch one page of a listing.
    #[instrument(skip_all, fields(listing = %listing, offset = request.offset))]
    pub async fn get_page(
        &self,
        listing: Listing,
        request: &PageRequest,
    ) -> Result<RecordPage, UpstreamError> {
        let url = self.url_for(listing)?;
        let start = Instant::now();

        let response = self
            .http
            .get(url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Upstream rejected page request");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        metrics::record_upstream_page_latency(start, listing);

        let page: RecordPage = serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamError::Malformed(format!("failed to parse {} page: {}", listing, e))
        })?;

        debug!(
            records = page.results.as_ref().map_or(0, Vec::len),
            "Fetched page"
        );

        Ok(page)
    }
}

impl RecordSource for SiengeClient {
    fn fetch_page(
        &self,
        listing: Listing,
        request: &PageRequest,
    ) -> impl Future<Output = Result<RecordPage, UpstreamError>> + Send {
        self.get_page(listing, request)
    }
}
