//! Raw HTTP client for the upstream message API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{TeleporterMessage, TimeWindow};
use crate::error::PipelineError;

/// One page of messages plus the continuation token, if any.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    /// Messages on this page.
    pub messages: Vec<TeleporterMessage>,
    /// Token to pass back for the next page; absent on the last page.
    pub next_page_token: Option<String>,
}

/// Seam between the pipeline and the upstream message API.
///
/// A call fetches exactly one page. Implementations classify failures into
/// the [`PipelineError`] taxonomy so the retrying wrapper can decide what
/// to do with them.
#[async_trait]
pub trait MessageApi: Send + Sync + std::fmt::Debug {
    /// Fetches one page of messages for the given window.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UpstreamRateLimited`] on HTTP 429.
    /// - [`PipelineError::NetworkUnavailable`] on timeouts, connection
    ///   failures, and 5xx statuses.
    /// - [`PipelineError::UpstreamBadResponse`] on other non-success
    ///   statuses or a body that does not parse.
    async fn fetch_page(
        &self,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<MessagePage, PipelineError>;
}

/// Connection settings for [`HttpMessageApiClient`].
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API, without trailing slash.
    pub base_url: String,
    /// Network identifier sent on every request.
    pub network: String,
    /// Requested page size.
    pub page_size: u32,
}

/// Wire shape of one upstream message. Field names follow the upstream
/// JSON contract; anything else in the payload is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    source_chain_id: String,
    destination_chain_id: String,
    source_timestamp: Option<i64>,
    destination_timestamp: Option<i64>,
}

/// Wire shape of one upstream page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    #[serde(default)]
    messages: Vec<RawMessage>,
    next_page_token: Option<String>,
}

/// Reqwest-backed [`MessageApi`] implementation.
///
/// Purely functional given its inputs: one call, one HTTP request, no
/// retries and no delays — policy lives in
/// [`super::retry::RetryingFetcher`].
#[derive(Debug, Clone)]
pub struct HttpMessageApiClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpMessageApiClient {
    /// Creates a client reusing the given reqwest client.
    #[must_use]
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl MessageApi for HttpMessageApiClient {
    async fn fetch_page(
        &self,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<MessagePage, PipelineError> {
        let url = format!("{}/messages", self.config.base_url);
        let mut request = self.http.get(&url).query(&[
            ("startTime", window.start().to_string()),
            ("endTime", window.end().to_string()),
            ("pageSize", self.config.page_size.to_string()),
            ("network", self.config.network.clone()),
        ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PipelineError::UpstreamRateLimited);
        }
        if status.is_server_error() {
            return Err(PipelineError::NetworkUnavailable(format!(
                "upstream returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(PipelineError::UpstreamBadResponse(format!(
                "unexpected status {status}"
            )));
        }

        let page: RawPage = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamBadResponse(e.to_string()))?;

        Ok(MessagePage {
            messages: page
                .messages
                .into_iter()
                .map(|raw| TeleporterMessage {
                    source_chain_id: raw.source_chain_id,
                    destination_chain_id: raw.destination_chain_id,
                    source_timestamp: raw.source_timestamp,
                    destination_timestamp: raw.destination_timestamp,
                })
                .collect(),
            next_page_token: page.next_page_token,
        })
    }
}

/// Maps reqwest transport failures into the retry taxonomy.
fn classify_transport_error(error: reqwest::Error) -> PipelineError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        PipelineError::NetworkUnavailable(error.to_string())
    } else {
        PipelineError::UpstreamBadResponse(error.to_string())
    }
}
