use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::debug;

use super::{require_object, AdapterSettings, PageEnvelope, SourceAdapter};
use crate::database_ops::errors::MalformedRecordError;
use crate::database_ops::product::{Product, NO_LINK, NO_NAME};
use crate::normalization::text::{enrich_specs, format_brand, split_name_specs};
use crate::normalization::value::{count_value, decimal_field, stock_flag, string_field};

/// Elasticsearch-backed catalog API; the offset is appended to the path and
/// `{size}` becomes the page size.
pub const DEFAULT_BASE_URL: &str = "https://www.jarir.com/api/catalogv1/product/store/sa-en/category_ids/1026/aggregation/true/size/{size}/from/";
pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const DEFAULT_SPEC_FIELD: &str = "jarir_processor_type";

const LINK_BASE: &str = "https://www.jarir.com/sa-en/";
const LINK_SUFFIX: &str = ".html";

/// jarir.com products.
///
/// Prices: `final_price`, then `price`, else `0`. There is no separate list
/// price, so `old_price` mirrors `new_price`. Stock is an integer flag and
/// links are built from `url_key`.
#[derive(Debug, Clone)]
pub struct JarirAdapter {
    settings: AdapterSettings,
}

impl JarirAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    fn link(item: &Value) -> String {
        match string_field(item, "url_key") {
            Some(slug) => format!("{LINK_BASE}{}{LINK_SUFFIX}", slug.trim_matches('/')),
            None => NO_LINK.to_string(),
        }
    }
}

impl SourceAdapter for JarirAdapter {
    fn source(&self) -> &str {
        &self.settings.store
    }

    fn category(&self) -> &str {
        &self.settings.category
    }

    fn parse_page(&self, body: &Value) -> PageEnvelope {
        let hits = body.get("hits");
        let items = hits
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .map(|hit| hit.get("_source").unwrap_or(hit).clone())
                    .collect()
            })
            .unwrap_or_default();
        let total = hits.and_then(|h| h.get("total")).and_then(count_value);
        PageEnvelope { items, total }
    }

    fn extract(
        &self,
        raw: &Value,
        captured_at: DateTime<FixedOffset>,
    ) -> Result<Product, MalformedRecordError> {
        let item = require_object(raw)?;

        let full_name = string_field(item, "name").unwrap_or_else(|| NO_NAME.to_string());
        let (name, specs) = split_name_specs(&full_name);
        let supplement = string_field(item, &self.settings.spec_field);
        let specs = enrich_specs(specs, supplement.as_deref());

        let new_price = decimal_field(item, "final_price")
            .or_else(|| decimal_field(item, "price"))
            .unwrap_or_else(|| BigDecimal::from(0));

        let in_stock = item
            .get("is_in_stock")
            .and_then(stock_flag)
            .unwrap_or(false);
        debug!(product = %full_name, in_stock, "jarir: stock flag");

        Ok(Product {
            name,
            specs,
            old_price: Some(new_price.clone()),
            new_price: Some(new_price),
            brand: format_brand(string_field(item, "brand").as_deref()),
            link: Self::link(item),
            category: self.settings.category.clone(),
            captured_at,
            in_stock,
            source: self.settings.store.clone(),
        })
    }
}
