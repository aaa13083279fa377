use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::database_ops::adapters::SourceAdapter;
use crate::database_ops::errors::FetchError;
use crate::database_ops::product::Product;

/// One GET per call; implementations classify failures for the retry policy.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Value, FetchError>;
}

/// reqwest-backed fetcher carrying the store's static headers.
pub struct HttpFetcher {
    client: Client,
    headers: HeaderMap,
}

impl HttpFetcher {
    pub fn new(headers: &[(String, String)], timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid header name `{name}`: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| anyhow::anyhow!("invalid value for header `{name}`: {e}"))?;
            map.insert(name, value);
        }
        Ok(Self {
            client,
            headers: map,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| FetchError::Transient(format!("unreadable body: {e}")))
    }
}

/// How the cursor is encoded into the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// Item offset starting at 0, advanced by the page size.
    Offset,
    /// Page number starting at 1, advanced by one.
    Page,
}

impl Paging {
    fn start(self) -> usize {
        match self {
            Paging::Offset => 0,
            Paging::Page => 1,
        }
    }

    fn advance(self, cursor: usize, page_size: usize) -> usize {
        match self {
            Paging::Offset => cursor + page_size,
            Paging::Page => cursor + 1,
        }
    }
}

/// Stands for the page size inside a base URL (`rows={size}`, `/size/{size}/`).
pub const SIZE_PLACEHOLDER: &str = "{size}";

/// Endpoint shape: base URL plus where the cursor goes.
#[derive(Debug, Clone)]
pub struct PageSpec {
    base: Url,
    pub page_size: usize,
    /// `Some(name)` sends `name=<cursor>` as a query pair; `None` appends the cursor to the path.
    pub page_param: Option<String>,
    pub paging: Paging,
}

impl PageSpec {
    pub fn new(
        base_url: &str,
        page_size: usize,
        page_param: Option<String>,
        paging: Paging,
    ) -> anyhow::Result<Self> {
        if page_size == 0 {
            anyhow::bail!("page size must be positive");
        }
        if !base_url.contains(SIZE_PLACEHOLDER) {
            warn!(
                base_url,
                page_size,
                "base URL has no {{size}} placeholder; the server's page size must equal the configured one"
            );
        }
        let base = Url::parse(&base_url.replace(SIZE_PLACEHOLDER, &page_size.to_string()))
            .map_err(|e| anyhow::anyhow!("invalid endpoint base URL: {e}"))?;
        Ok(Self {
            base,
            page_size,
            page_param,
            paging,
        })
    }

    pub fn page_url(&self, cursor: usize) -> Url {
        let mut url = self.base.clone();
        match &self.page_param {
            Some(param) => {
                url.query_pairs_mut().append_pair(param, &cursor.to_string());
            }
            None => {
                let path = format!("{}{}", self.base.path(), cursor);
                url.set_path(&path);
            }
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The store returned an empty page.
    Exhausted,
    /// Collected at least as many products as the store's total-count hint.
    CountReached(usize),
    /// Non-retryable status; results are partial.
    Terminal(StatusCode),
    /// Too many consecutive transient failures on one offset; results are partial.
    RetriesExhausted,
}

impl StopReason {
    pub fn is_partial(&self) -> bool {
        matches!(self, StopReason::Terminal(_) | StopReason::RetriesExhausted)
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub products: Vec<Product>,
    pub stop: StopReason,
    /// HTTP requests issued, retries included.
    pub requests: usize,
    /// Items the adapter rejected.
    pub skipped: usize,
}

pub struct Paginator {
    spec: PageSpec,
    retry_delay: Duration,
    max_retries: u32,
}

impl Paginator {
    pub fn new(spec: PageSpec, retry_delay: Duration) -> Self {
        Self {
            spec,
            retry_delay,
            max_retries: 0,
        }
    }

    /// Cap consecutive transient failures on a single offset; `0` retries forever.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Walk the endpoint page by page until it runs dry, the total-count hint
    /// is met, or a terminal status cuts the run short.
    pub async fn fetch_all<F, A>(
        &self,
        fetcher: &F,
        adapter: &A,
        captured_at: DateTime<FixedOffset>,
    ) -> FetchOutcome
    where
        F: PageFetcher + ?Sized,
        A: SourceAdapter + ?Sized,
    {
        let source = adapter.source().to_string();
        let category = adapter.category().to_string();
        let mut cursor = self.spec.paging.start();
        let mut products: Vec<Product> = Vec::new();
        let mut requests = 0usize;
        let mut skipped = 0usize;
        let mut failures = 0u32;

        let stop = loop {
            let url = self.spec.page_url(cursor);
            requests += 1;
            debug!(%source, %category, offset = cursor, %url, "requesting page");

            let body = match fetcher.fetch(&url).await {
                Ok(body) => {
                    failures = 0;
                    body
                }
                Err(FetchError::Transient(reason)) => {
                    failures += 1;
                    if self.max_retries > 0 && failures > self.max_retries {
                        warn!(%source, %category, offset = cursor, attempts = failures, %reason, "giving up on page after repeated failures");
                        break StopReason::RetriesExhausted;
                    }
                    warn!(
                        %source,
                        %category,
                        offset = cursor,
                        %reason,
                        delay_secs = self.retry_delay.as_secs_f64(),
                        "an error occurred fetching page; retrying same offset"
                    );
                    sleep(self.retry_delay).await;
                    continue;
                }
                Err(FetchError::Terminal(status)) => {
                    warn!(%source, %category, offset = cursor, %status, "failed to fetch page; stopping with partial results");
                    break StopReason::Terminal(status);
                }
            };

            let page = adapter.parse_page(&body);
            if page.items.is_empty() {
                info!(%source, %category, offset = cursor, "no more products found; stopping");
                break StopReason::Exhausted;
            }

            for raw in &page.items {
                match adapter.extract(raw, captured_at) {
                    Ok(product) => products.push(product),
                    Err(e) => {
                        skipped += 1;
                        warn!(%source, %category, offset = cursor, error = %e, "skipping item");
                    }
                }
            }

            if let Some(total) = page.total {
                if products.len() >= total {
                    info!(%source, %category, total, "fetched all products");
                    break StopReason::CountReached(total);
                }
            }

            cursor = self.spec.paging.advance(cursor, self.spec.page_size);
        };

        FetchOutcome {
            products,
            stop,
            requests,
            skipped,
        }
    }
}
