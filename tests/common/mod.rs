//! Helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use price_harvest::database_ops::batch_writer::ProductSink;
use price_harvest::database_ops::errors::{FetchError, PersistenceError};
use price_harvest::database_ops::paginator::PageFetcher;
use price_harvest::database_ops::product::Product;
use serde_json::{json, Value};
use url::Url;

/// Replays canned page responses in order and records requested URLs.
/// Once the script runs out it answers with an empty body.
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<Value, FetchError>>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }
}

/// Keeps every batch it is handed; optionally rejects writes.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<Product>>>,
    fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn batches(&self) -> Vec<Vec<Product>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductSink for MemorySink {
    async fn persist(&self, products: &[Product]) -> Result<u64, PersistenceError> {
        if self.fail {
            return Err(PersistenceError::Rejected(sqlx::Error::Protocol(
                "relation does not exist".into(),
            )));
        }
        self.batches.lock().unwrap().push(products.to_vec());
        Ok(products.len() as u64)
    }
}

/// One Elasticsearch-style page as the jarir catalog API returns it.
pub fn jarir_page(names: &[&str], total: usize) -> Value {
    let hits: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            json!({
                "_source": {
                    "name": n,
                    "final_price": 1000 + i,
                    "brand": "APPLE",
                    "is_in_stock": 1,
                    "url_key": format!("item-{i}")
                }
            })
        })
        .collect();
    json!({"hits": {"total": {"value": total}, "hits": hits}})
}
