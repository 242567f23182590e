//! Catalog lookups with retry and pacing.
//!
//! [`CandidateFetcher::fetch`] never fails: transient errors are retried with
//! exponential backoff, and anything left over (exhausted retries, client
//! errors, unrecognized pages) degrades to an empty candidate list.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::time::Instant;

use crate::candidate::Candidate;
use crate::goodreads::{self, BASE_URL};
use crate::normalize::normalize_title;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient network failure: {0}")]
    Transient(String),
    #[error("catalog answered HTTP {0}")]
    Status(u16),
    #[error("unrecognized search page: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Raw page retrieval, the only part of a lookup that touches the network.
#[allow(async_fn_in_trait)]
pub trait SearchTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed transport with browser-like headers.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl SearchTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))
    }
}

/// `max_retries` is the total number of attempts; the pause before attempt
/// `n + 1` is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

pub fn search_url(normalized_query: &str) -> String {
    format!(
        "{BASE_URL}/search?q={}",
        urlencoding::encode(normalized_query)
    )
}

pub struct CandidateFetcher<T> {
    transport: T,
    retry: RetryPolicy,
    max_results: usize,
    pace: Duration,
    last_request: Option<Instant>,
}

impl<T: SearchTransport> CandidateFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            max_results: DEFAULT_MAX_RESULTS,
            pace: Duration::ZERO,
            last_request: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Minimum spacing between two successive lookups.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Candidates in catalog relevance order; empty on any failure.
    pub async fn fetch(&mut self, query: &str) -> Vec<Candidate> {
        let normalized = normalize_title(query);
        if normalized.is_empty() {
            debug!("query {query:?} normalizes to nothing; not searching");
            return Vec::new();
        }
        let url = search_url(&normalized);
        let attempts = self.retry.max_retries.max(1);
        self.wait_for_pace().await;
        for attempt in 0..attempts {
            debug!("GET {url} (attempt {}/{attempts})", attempt + 1);
            match self.transport.get(&url).await {
                Ok(body) => {
                    return match goodreads::parse_search_results(&body, self.max_results) {
                        Ok(candidates) => {
                            debug!("{} candidate(s) for {normalized:?}", candidates.len());
                            candidates
                        }
                        Err(e) => {
                            debug!("{normalized:?}: {e}");
                            Vec::new()
                        }
                    };
                }
                Err(e) if e.is_retriable() && attempt + 1 < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!("{normalized:?}: {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{normalized:?}: {e}; giving up");
                    return Vec::new();
                }
            }
        }
        Vec::new()
    }

    async fn wait_for_pace(&mut self) {
        if let Some(at) = self.last_request {
            let elapsed = at.elapsed();
            if elapsed < self.pace {
                tokio::time::sleep(self.pace - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}
