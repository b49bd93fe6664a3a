//! Congress.gov v3 API client: retrying JSON fetches, lazy API-key
//! resolution, and bounded-concurrency detail enrichment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info_span, warn, Instrument};

pub mod payload;

pub use payload::{BillDetail, BillDetailFields, BillEntry, BillSummary, ListPayload};

pub const CRATE_NAME: &str = "billscope-client";

pub const DEFAULT_BASE_URL: &str = "https://api.congress.gov/v3";
pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 250;
pub const DETAIL_CONCURRENCY: usize = 4;

/// Accepted key names, checked in order. The first one wins.
pub const API_KEY_ENV_VARS: [&str; 5] = [
    "CONGRESS_API_KEY",
    "CONGRESS_GOV_API_KEY",
    "CONGRESS_GPO_API_KEY",
    "GPO_CONGRESS_API_KEY",
    "CONGRESS_DOT_GOV_API_KEY",
];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(
        "missing Congress.gov API key; set CONGRESS_API_KEY (or one of its aliases) before syncing"
    )]
    MissingApiKey,
    #[error("cannot fetch bill detail without full identifier (congress={congress:?}, type={bill_type:?}, number={number:?})")]
    MissingIdentifier {
        congress: Option<String>,
        bill_type: Option<String>,
        number: Option<String>,
    },
    #[error("invalid request url: {0}")]
    Config(String),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_http_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_transport_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub backoff: BackoffPolicy,
    /// Explicit key, bypassing the environment lookup. Used by tests.
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            user_agent: None,
            backoff: BackoffPolicy::default(),
            api_key: None,
        }
    }
}

/// List-request parameters. Dates are calendar days (`YYYY-MM-DD`), expanded
/// to full-day UTC bounds on the wire.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// A bill paired with its (best-effort) detail fetch result.
#[derive(Debug, Clone)]
pub struct EnrichedBill {
    pub bill: BillSummary,
    pub detail: Option<BillDetail>,
    pub error: Option<String>,
}

/// Non-JSON document fetched on behalf of a download or proxy route.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

fn resolve_api_key_with(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}

fn display_url(url: &reqwest::Url) -> String {
    // Never echo the api_key query parameter back in errors or logs.
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.to_string()
}

#[derive(Debug, Clone)]
pub struct CongressClient {
    http: reqwest::Client,
    base_url: String,
    backoff: BackoffPolicy,
    api_key_override: Option<String>,
}

impl CongressClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder.build().context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: config.base_url,
            backoff: config.backoff,
            api_key_override: config.api_key,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Resolve the API key at call time, so a process can start without one
    /// and still serve locally stored data.
    fn api_key(&self) -> Result<String, ClientError> {
        if let Some(key) = &self.api_key_override {
            return Ok(key.clone());
        }
        resolve_api_key_with(|name| std::env::var(name).ok()).ok_or(ClientError::MissingApiKey)
    }

    fn api_url(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Url, ClientError> {
        let key = self.api_key()?;
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| ClientError::Config(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("api_key", &key);
        for (name, value) in params {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }

    fn absolute_api_url(&self, raw: &str) -> Result<reqwest::Url, ClientError> {
        let key = self.api_key()?;
        let mut url =
            reqwest::Url::parse(raw).map_err(|err| ClientError::Config(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("api_key", &key);
        Ok(url)
    }

    async fn get_json(&self, url: reqwest::Url) -> Result<serde_json::Value, ClientError> {
        let span = info_span!("congress_fetch", url = %display_url(&url));
        async {
            // The final attempt never retries, so every iteration that does
            // not continue returns.
            let mut attempt = 0;
            loop {
                match self
                    .http
                    .get(url.clone())
                    .header(ACCEPT, "application/json")
                    .send()
                    .await
                {
                    Ok(resp) => {
                        let status = resp.status();
                        if status.is_success() {
                            return Ok(resp.json::<serde_json::Value>().await?);
                        }
                        if classify_http_status(status) == RetryDisposition::Retryable
                            && attempt < self.backoff.max_retries
                        {
                            warn!(status = status.as_u16(), attempt, "retrying upstream request");
                            tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(ClientError::HttpStatus {
                            status: status.as_u16(),
                            url: display_url(&url),
                        });
                    }
                    Err(err) => {
                        if classify_transport_error(&err) == RetryDisposition::Retryable
                            && attempt < self.backoff.max_retries
                        {
                            warn!(error = %err, attempt, "retrying after transport error");
                            tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(ClientError::Request(err));
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// List bills, newest updates first.
    pub async fn fetch_recent_bills(&self, query: &ListQuery) -> Result<Vec<BillSummary>, ClientError> {
        let mut params = vec![
            (
                "limit",
                clamp_limit(query.limit.unwrap_or(DEFAULT_LIMIT)).to_string(),
            ),
            ("sort", "updateDate desc".to_string()),
        ];
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("query", search.to_string()));
        }
        if let Some(from) = query.date_from.as_deref().filter(|s| !s.is_empty()) {
            params.push(("fromDateTime", format!("{from}T00:00:00Z")));
        }
        if let Some(to) = query.date_to.as_deref().filter(|s| !s.is_empty()) {
            params.push(("toDateTime", format!("{to}T23:59:59Z")));
        }

        let url = self.api_url("/bill", &params)?;
        let payload: ListPayload = serde_json::from_value(self.get_json(url).await?)?;
        Ok(payload
            .into_entries()
            .into_iter()
            .map(BillEntry::into_summary)
            .collect())
    }

    /// Fetch a single bill's detail by full identifier.
    pub async fn fetch_bill_detail(
        &self,
        congress: &str,
        bill_type: &str,
        number: &str,
    ) -> Result<BillDetail, ClientError> {
        let normalized_type = bill_type.to_lowercase();
        if congress.is_empty() || normalized_type.is_empty() || number.is_empty() {
            return Err(ClientError::MissingIdentifier {
                congress: Some(congress.to_string()).filter(|s| !s.is_empty()),
                bill_type: Some(bill_type.to_string()).filter(|s| !s.is_empty()),
                number: Some(number.to_string()).filter(|s| !s.is_empty()),
            });
        }
        let url = self.api_url(&format!("/bill/{congress}/{normalized_type}/{number}"), &[])?;
        Ok(BillDetail::from_payload(self.get_json(url).await?)?)
    }

    /// Fetch a bill's detail via the `url` carried on a list entry.
    pub async fn fetch_detail_by_url(&self, raw_url: &str) -> Result<BillDetail, ClientError> {
        let url = self.absolute_api_url(raw_url)?;
        Ok(BillDetail::from_payload(self.get_json(url).await?)?)
    }

    /// Fetch an arbitrary sub-resource (actions, committees, text versions)
    /// by the absolute URL the API handed out.
    pub async fn fetch_resource(&self, raw_url: &str) -> Result<serde_json::Value, ClientError> {
        let url = self.absolute_api_url(raw_url)?;
        self.get_json(url).await
    }

    /// Fetch a published bill document (GPO-hosted text, HTML, or XML).
    /// Single attempt; callers decide the fallback chain.
    pub async fn fetch_document(
        &self,
        raw_url: &str,
        accept: &str,
    ) -> Result<FetchedDocument, ClientError> {
        let url =
            reqwest::Url::parse(raw_url).map_err(|err| ClientError::Config(err.to_string()))?;
        let resp = self.http.get(url.clone()).header(ACCEPT, accept).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                url: display_url(&url),
            });
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp.bytes().await?.to_vec();
        Ok(FetchedDocument { content_type, body })
    }

    fn detail_identifier(bill: &BillSummary) -> (String, String, String) {
        (
            bill.congress.clone().unwrap_or_default(),
            bill.bill_type.clone().unwrap_or_default(),
            bill.number.clone().unwrap_or_default(),
        )
    }

    /// Fetch details for a batch of bills with at most `concurrency` in
    /// flight. Results come back in input order; per-bill failures are
    /// recorded, never propagated.
    pub async fn enrich_bills_with_detail(
        &self,
        bills: Vec<BillSummary>,
        concurrency: usize,
    ) -> Vec<EnrichedBill> {
        let limit = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(bills.len());
        for bill in bills {
            let client = self.clone();
            let limit = limit.clone();
            let fallback = bill.clone();
            let handle = tokio::spawn(async move {
                let _permit = limit.acquire_owned().await.expect("semaphore not closed");
                let (congress, bill_type, number) = CongressClient::detail_identifier(&bill);
                match client.fetch_bill_detail(&congress, &bill_type, &number).await {
                    Ok(detail) => EnrichedBill {
                        bill,
                        detail: Some(detail),
                        error: None,
                    },
                    Err(err) => EnrichedBill {
                        bill,
                        detail: None,
                        error: Some(err.to_string()),
                    },
                }
            });
            handles.push((handle, fallback));
        }

        let mut enriched = Vec::with_capacity(handles.len());
        for (handle, fallback) in handles {
            match handle.await {
                Ok(entry) => enriched.push(entry),
                Err(err) => enriched.push(EnrichedBill {
                    bill: fallback,
                    detail: None,
                    error: Some(format!("detail task panicked: {err}")),
                }),
            }
        }
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_clamps_into_api_bounds() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(100), 100);
        assert_eq!(clamp_limit(251), MAX_LIMIT);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(8));
    }

    #[test]
    fn api_key_lookup_honors_alias_order() {
        let found = resolve_api_key_with(|name| match name {
            "CONGRESS_GPO_API_KEY" => Some("gpo-key".to_string()),
            "CONGRESS_DOT_GOV_API_KEY" => Some("dot-gov-key".to_string()),
            _ => None,
        });
        assert_eq!(found.as_deref(), Some("gpo-key"));

        let blank_skipped = resolve_api_key_with(|name| match name {
            "CONGRESS_API_KEY" => Some("   ".to_string()),
            "CONGRESS_GOV_API_KEY" => Some("real-key".to_string()),
            _ => None,
        });
        assert_eq!(blank_skipped.as_deref(), Some("real-key"));

        assert!(resolve_api_key_with(|_| None).is_none());
    }

    #[test]
    fn status_classification_retries_server_side_failures() {
        assert_eq!(
            classify_http_status(StatusCode::INTERNAL_SERVER_ERROR),
            RetryDisposition::Retryable
        );
        assert_eq!(
            classify_http_status(StatusCode::TOO_MANY_REQUESTS),
            RetryDisposition::Retryable
        );
        assert_eq!(
            classify_http_status(StatusCode::NOT_FOUND),
            RetryDisposition::NonRetryable
        );
        assert_eq!(
            classify_http_status(StatusCode::FORBIDDEN),
            RetryDisposition::NonRetryable
        );
    }

    #[test]
    fn list_url_carries_window_and_sort_params() {
        let client = CongressClient::new(ClientConfig {
            api_key: Some("test-key".to_string()),
            ..ClientConfig::default()
        })
        .expect("client");

        let url = client
            .api_url(
                "/bill",
                &[
                    ("limit", "100".to_string()),
                    ("sort", "updateDate desc".to_string()),
                    ("fromDateTime", "2026-01-01T00:00:00Z".to_string()),
                ],
            )
            .expect("url");
        let query = url.query().unwrap_or_default();
        assert!(query.contains("format=json"));
        assert!(query.contains("api_key=test-key"));
        assert!(query.contains("sort=updateDate+desc"));
        assert!(query.contains("fromDateTime=2026-01-01T00%3A00%3A00Z"));
    }

    #[test]
    fn detail_requires_full_identifier() {
        let client = CongressClient::new(ClientConfig {
            api_key: Some("test-key".to_string()),
            ..ClientConfig::default()
        })
        .expect("client");

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let err = rt
            .block_on(client.fetch_bill_detail("119", "", "4820"))
            .expect_err("missing type must fail");
        assert!(matches!(err, ClientError::MissingIdentifier { .. }));
    }

    #[test]
    fn error_urls_never_leak_the_api_key() {
        let url = reqwest::Url::parse("https://api.congress.gov/v3/bill?api_key=secret").unwrap();
        assert_eq!(display_url(&url), "https://api.congress.gov/v3/bill");
    }
}
