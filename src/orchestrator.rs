//! One scrape run: a (store, category) pair fetched page by page, then written in one batch.
//!
//! `ScrapeConfig` is the whole configuration surface; changing what gets
//! scraped means changing its values, never the code. `ScrapeContext` owns
//! the run's resources (HTTP client, pool) from start to teardown.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::database_ops::adapters::{Adapter, AdapterSettings, SourceAdapter, SourceKind};
use crate::database_ops::batch_writer::{DryRunSink, ProductSink, ProductStore, TableName};
use crate::database_ops::paginator::{
    FetchOutcome, HttpFetcher, PageFetcher, PageSpec, Paginator, Paging, StopReason,
};
use crate::database_ops::product::capture_hour;
use crate::util::db::{Db, PoolBounds};
use crate::util::env::{db_url, env_flag, env_opt, env_parse};

pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_TABLE: &str = "products";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Resolved lazily so dry runs need no database settings.
    pub database_url: Option<String>,
    pub table: String,
    pub bounds: PoolBounds,
    pub auto_create: bool,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub source: SourceKind,
    pub base_url: String,
    pub page_size: usize,
    pub page_param: Option<String>,
    pub paging: Paging,
    pub headers: Vec<(String, String)>,
    pub adapter: AdapterSettings,
    pub retry_delay: Duration,
    /// Consecutive transient failures tolerated on one offset; 0 = unbounded.
    pub max_retries: u32,
    pub http_timeout: Duration,
    /// Fail the run instead of saving a partial scrape after a terminal HTTP status.
    pub strict: bool,
    pub store: StoreConfig,
}

impl ScrapeConfig {
    /// Built-in settings for a store, without consulting the environment.
    pub fn preset(source: SourceKind) -> Self {
        Self {
            source,
            base_url: source.default_base_url().to_string(),
            page_size: source.default_page_size(),
            page_param: source.default_page_param().map(str::to_string),
            paging: Paging::Offset,
            headers: source
                .default_headers()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            adapter: AdapterSettings::for_kind(source),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            max_retries: 0,
            http_timeout: Duration::from_secs(30),
            strict: false,
            store: StoreConfig {
                database_url: None,
                table: DEFAULT_TABLE.to_string(),
                bounds: PoolBounds::default(),
                auto_create: false,
            },
        }
    }

    /// Preset for `source` (or `SCRAPE_SOURCE`) with environment overrides applied.
    pub fn from_env(source: Option<SourceKind>) -> Result<Self> {
        let source = match source {
            Some(s) => s,
            None => env_opt("SCRAPE_SOURCE")
                .map(|s| s.parse::<SourceKind>())
                .transpose()?
                .unwrap_or(SourceKind::Extra),
        };
        let mut cfg = Self::preset(source);

        if let Some(url) = env_opt("SCRAPE_BASE_URL") {
            cfg.base_url = url.trim().to_string();
        }
        cfg.page_size = env_parse("SCRAPE_PAGE_SIZE", cfg.page_size);
        if let Some(param) = env_opt("SCRAPE_PAGE_PARAM") {
            let param = param.trim();
            cfg.page_param = (!param.eq_ignore_ascii_case("path")).then(|| param.to_string());
        }
        if let Some(paging) = env_opt("SCRAPE_PAGING") {
            cfg.paging = match paging.trim().to_ascii_lowercase().as_str() {
                "offset" => Paging::Offset,
                "page" => Paging::Page,
                other => anyhow::bail!("SCRAPE_PAGING must be `offset` or `page`, got `{other}`"),
            };
        }
        if let Some(raw) = env_opt("SCRAPE_HEADERS") {
            let extra = parse_header_overrides(&raw).context("SCRAPE_HEADERS")?;
            merge_headers(&mut cfg.headers, extra);
        }
        if let Some(category) = env_opt("SCRAPE_CATEGORY") {
            cfg.adapter.category = category.trim().to_string();
        }
        if let Some(store) = env_opt("SCRAPE_STORE") {
            cfg.adapter.store = store.trim().to_string();
        }
        if let Some(field) = env_opt("SCRAPE_SPEC_FIELD") {
            cfg.adapter.spec_field = field.trim().to_string();
        }
        cfg.retry_delay = Duration::from_secs(env_parse(
            "SCRAPE_RETRY_DELAY_SECS",
            DEFAULT_RETRY_DELAY_SECS,
        ));
        cfg.max_retries = env_parse("SCRAPE_MAX_RETRIES", 0u32);
        cfg.http_timeout = Duration::from_secs(env_parse("SCRAPE_HTTP_TIMEOUT_SECS", 30u64));
        cfg.strict = env_flag("SCRAPE_STRICT", false);

        cfg.store.database_url = db_url().ok();
        cfg.store.table = env_opt("DB_TABLE")
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let defaults = PoolBounds::default();
        cfg.store.bounds = PoolBounds {
            min_connections: env_parse("DB_MIN_CONNS", defaults.min_connections),
            max_connections: env_parse("DB_MAX_CONNS", defaults.max_connections),
        };
        cfg.store.auto_create = env_flag("DB_AUTO_CREATE", false);

        Ok(cfg)
    }

    pub fn page_spec(&self) -> Result<PageSpec> {
        PageSpec::new(
            &self.base_url,
            self.page_size,
            self.page_param.clone(),
            self.paging,
        )
    }

    pub fn adapter(&self) -> Adapter {
        Adapter::new(self.source, self.adapter.clone())
    }
}

/// `SCRAPE_HEADERS` is a JSON object of string values.
fn parse_header_overrides(raw: &str) -> Result<Vec<(String, String)>> {
    let value: Value = serde_json::from_str(raw).context("expected a JSON object")?;
    let map = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("expected a JSON object"))?;
    map.iter()
        .map(|(k, v)| {
            v.as_str()
                .map(|s| (k.clone(), s.to_string()))
                .ok_or_else(|| anyhow::anyhow!("header `{k}` must be a string"))
        })
        .collect()
}

/// Header names compare case-insensitively; overrides replace presets.
fn merge_headers(headers: &mut Vec<(String, String)>, overrides: Vec<(String, String)>) {
    for (name, value) in overrides {
        match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => headers.push((name, value)),
        }
    }
}

/// Resources for one run; created at start, torn down by [`ScrapeContext::close`].
pub struct ScrapeContext {
    pub fetcher: HttpFetcher,
    pub sink: Box<dyn ProductSink>,
    db: Option<Db>,
}

impl ScrapeContext {
    pub async fn open(config: &ScrapeConfig, dry_run: bool) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.headers, config.http_timeout)
            .context("building HTTP client")?;

        if dry_run {
            info!("dry run: products will be printed, not saved");
            return Ok(Self {
                fetcher,
                sink: Box::new(DryRunSink),
                db: None,
            });
        }

        let table = TableName::new(&config.store.table)?;
        let url = config
            .store
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no database configured (set DATABASE_URL or DB_*)"))?;
        let db = Db::connect_lazy(url, config.store.bounds)?;
        let store = ProductStore::new(db.pool.clone(), table);
        if config.store.auto_create {
            store.ensure_table().await?;
        }
        Ok(Self {
            fetcher,
            sink: Box::new(store),
            db: Some(db),
        })
    }

    pub async fn close(self) {
        if let Some(db) = self.db {
            db.close().await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source: String,
    pub category: String,
    pub captured_at: DateTime<FixedOffset>,
    pub fetched: usize,
    pub skipped: usize,
    pub requests: usize,
    pub persisted: u64,
    pub stop: StopReason,
}

pub struct Orchestrator {
    config: ScrapeConfig,
}

impl Orchestrator {
    pub fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }

    /// Open the run context, scrape, persist, and tear the context down on every path.
    pub async fn run(&self, dry_run: bool) -> Result<RunSummary> {
        let ctx = ScrapeContext::open(&self.config, dry_run).await?;
        let result = self.run_with(&ctx.fetcher, ctx.sink.as_ref()).await;
        ctx.close().await;
        result
    }

    /// Paginate with `fetcher`, then hand everything to `sink` in one batch.
    pub async fn run_with<F, S>(&self, fetcher: &F, sink: &S) -> Result<RunSummary>
    where
        F: PageFetcher + ?Sized,
        S: ProductSink + ?Sized,
    {
        let adapter = self.config.adapter();
        let paginator = Paginator::new(self.config.page_spec()?, self.config.retry_delay)
            .with_max_retries(self.config.max_retries);
        let captured_at = capture_hour(Utc::now());

        info!(
            source = adapter.source(),
            category = adapter.category(),
            base_url = %self.config.base_url,
            page_size = self.config.page_size,
            "starting scrape"
        );

        let FetchOutcome {
            products,
            stop,
            requests,
            skipped,
        } = paginator.fetch_all(fetcher, &adapter, captured_at).await;

        if stop.is_partial() {
            if self.config.strict {
                anyhow::bail!(
                    "scrape of {}/{} stopped early ({stop:?}) after {} products; strict mode refuses a partial save",
                    adapter.source(),
                    adapter.category(),
                    products.len()
                );
            }
            warn!(
                source = adapter.source(),
                category = adapter.category(),
                ?stop,
                count = products.len(),
                "scrape stopped early; saving partial results"
            );
        }

        let persisted = match sink.persist(&products).await {
            Ok(n) => n,
            Err(e) => {
                error!(
                    source = adapter.source(),
                    category = adapter.category(),
                    error = %e,
                    "failed to save products"
                );
                return Err(anyhow::Error::new(e).context(format!(
                    "saving {} products for {}/{}",
                    products.len(),
                    adapter.source(),
                    adapter.category()
                )));
            }
        };

        let summary = RunSummary {
            source: adapter.source().to_string(),
            category: adapter.category().to_string(),
            captured_at,
            fetched: products.len(),
            skipped,
            requests,
            persisted,
            stop,
        };
        info!(
            source = %summary.source,
            category = %summary.category,
            fetched = summary.fetched,
            persisted = summary.persisted,
            requests = summary.requests,
            "scrape finished"
        );
        Ok(summary)
    }
}
