use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::debug;

use super::{require_object, AdapterSettings, PageEnvelope, SourceAdapter};
use crate::database_ops::errors::MalformedRecordError;
use crate::database_ops::product::{Product, NO_LINK, NO_NAME};
use crate::normalization::text::{enrich_specs, format_brand, split_name_specs};
use crate::normalization::value::{
    count_value, decimal_field, first_string, stock_flag, string_field,
};

/// Unbxd category search backing extra.com (Riyadh availability boost, tablets family).
/// `rows={size}` is filled with the page size.
pub const DEFAULT_BASE_URL: &str = "https://search.unbxd.io/21705619e273429e5767eea44ccb1ad5/ss-unbxd-auk-extra-saudi-en-prod11541714990488/category?stats=price&selectedfacet=true&facet.multiselect=true&rows={size}&bfrule=inStockCities%3A%22SA-riyadh%22+OR+sellingOutFastCities%3A%22SA-riyadh%22+OR+restockableCities%3ASA-riyadh&boost=if%28eq%28query%28%24bfrule%29%2Cfalse%29%2C0%2C1%29&filter=familyEn_uFilter%3ATablets&filter=type%3APRODUCT&p=categories_uFilter%3A%222%22&pagetype=boolean&facet=true&version=V2";
pub const DEFAULT_PAGE_SIZE: usize = 96;
pub const DEFAULT_SPEC_FIELD: &str = "featureEnProcessorCore";

const STORE_ORIGIN: &str = "https://www.extra.com";

/// extra.com products.
///
/// Prices: `sellingPrice`, then `price`, else null. `wasPrice` is the list
/// price. Brand arrives as a list, stock as a native boolean.
#[derive(Debug, Clone)]
pub struct ExtraAdapter {
    settings: AdapterSettings,
}

impl ExtraAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    fn link(item: &Value) -> String {
        match string_field(item, "productUrl") {
            Some(u) if u.starts_with("http://") || u.starts_with("https://") => u,
            Some(u) => url::Url::parse(STORE_ORIGIN)
                .and_then(|base| base.join(&u))
                .map(|joined| joined.to_string())
                .unwrap_or(u),
            None => NO_LINK.to_string(),
        }
    }
}

impl SourceAdapter for ExtraAdapter {
    fn source(&self) -> &str {
        &self.settings.store
    }

    fn category(&self) -> &str {
        &self.settings.category
    }

    fn parse_page(&self, body: &Value) -> PageEnvelope {
        let response = body.get("response");
        let items = response
            .and_then(|r| r.get("products"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total = response
            .and_then(|r| r.get("numberOfProducts"))
            .and_then(count_value);
        PageEnvelope { items, total }
    }

    fn extract(
        &self,
        raw: &Value,
        captured_at: DateTime<FixedOffset>,
    ) -> Result<Product, MalformedRecordError> {
        let item = require_object(raw)?;

        let full_name = string_field(item, "nameEn").unwrap_or_else(|| NO_NAME.to_string());
        let (name, specs) = split_name_specs(&full_name);
        let supplement = string_field(item, &self.settings.spec_field);
        let specs = enrich_specs(specs, supplement.as_deref());

        let new_price = decimal_field(item, "sellingPrice").or_else(|| decimal_field(item, "price"));
        let old_price = decimal_field(item, "wasPrice").or_else(|| new_price.clone());

        let in_stock = item
            .get("inStockFlag")
            .and_then(stock_flag)
            .unwrap_or(false);
        debug!(product = %full_name, in_stock, "extra: stock flag");

        Ok(Product {
            name,
            specs,
            new_price,
            old_price,
            brand: format_brand(first_string(item, "brand").as_deref()),
            link: Self::link(item),
            category: self.settings.category.clone(),
            captured_at,
            in_stock,
            source: self.settings.store.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::adapters::SourceKind;
    use crate::database_ops::product::{capture_hour, NO_BRAND, NO_SPECS};
    use bigdecimal::BigDecimal;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::str::FromStr;

    fn adapter() -> ExtraAdapter {
        ExtraAdapter::new(AdapterSettings::for_kind(SourceKind::Extra))
    }

    fn hour() -> DateTime<FixedOffset> {
        capture_hour(Utc.with_ymd_and_hms(2024, 9, 21, 10, 30, 0).unwrap())
    }

    #[test]
    fn maps_a_full_record() {
        let item = json!({
            "nameEn": "Galaxy Tab S9, 256GB, Wi-Fi, Graphite",
            "featureEnProcessorCore": "Octa Core",
            "productUrl": "https://www.extra.com/en-sa/tablets/galaxy-tab-s9/p/100",
            "sellingPrice": 2899,
            "wasPrice": 3499.5,
            "inStockFlag": true,
            "brand": ["SAMSNG"]
        });
        let p = adapter().extract(&item, hour()).unwrap();
        assert_eq!(p.name, "Galaxy Tab S9");
        assert_eq!(p.specs, "256GB, Wi-Fi, Graphite, Octa Core");
        assert_eq!(p.new_price, Some(BigDecimal::from(2899)));
        assert_eq!(p.old_price, Some(BigDecimal::from_str("3499.5").unwrap()));
        assert_eq!(p.brand, "Samsung");
        assert_eq!(p.link, "https://www.extra.com/en-sa/tablets/galaxy-tab-s9/p/100");
        assert_eq!(p.category, "tablets");
        assert_eq!(p.source, "extra");
        assert!(p.in_stock);
        assert_eq!(p.captured_at, hour());
    }

    #[test]
    fn empty_record_falls_back_everywhere() {
        let p = adapter().extract(&json!({}), hour()).unwrap();
        assert_eq!(p.name, NO_NAME);
        assert_eq!(p.specs, NO_SPECS);
        assert_eq!(p.new_price, None);
        assert_eq!(p.old_price, None);
        assert_eq!(p.brand, NO_BRAND);
        assert_eq!(p.link, NO_LINK);
        assert!(!p.in_stock);
        assert_eq!(p.category, "tablets");
    }

    #[test]
    fn old_price_defaults_to_selling_price() {
        let p = adapter()
            .extract(&json!({"nameEn": "iPad", "sellingPrice": "1499.00"}), hour())
            .unwrap();
        assert_eq!(p.new_price, Some(BigDecimal::from(1499)));
        assert_eq!(p.old_price, p.new_price);
    }

    #[test]
    fn generic_price_is_used_when_selling_price_missing() {
        let p = adapter()
            .extract(&json!({"nameEn": "iPad", "price": 999}), hour())
            .unwrap();
        assert_eq!(p.new_price, Some(BigDecimal::from(999)));
    }

    #[test]
    fn supplement_replaces_specs_sentinel() {
        let p = adapter()
            .extract(&json!({"nameEn": "iPad Air", "featureEnProcessorCore": "M2"}), hour())
            .unwrap();
        assert_eq!(p.name, "iPad Air");
        assert_eq!(p.specs, "M2");
    }

    #[test]
    fn relative_links_are_made_absolute() {
        let p = adapter()
            .extract(&json!({"productUrl": "/en-sa/p/123"}), hour())
            .unwrap();
        assert_eq!(p.link, "https://www.extra.com/en-sa/p/123");
    }

    #[test]
    fn extraction_is_deterministic() {
        let item = json!({"nameEn": "Galaxy S21, 128GB, Black", "sellingPrice": 10, "brand": ["APPLE"]});
        let a = adapter().extract(&item, hour()).unwrap();
        let b = adapter().extract(&item, hour()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn envelope_yields_items_and_total() {
        let body = json!({"response": {"numberOfProducts": 3, "products": [{"nameEn": "a"}, {"nameEn": "b"}]}});
        let page = adapter().parse_page(&body);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(3));

        let empty = adapter().parse_page(&json!({"error": "nope"}));
        assert!(empty.items.is_empty());
        assert_eq!(empty.total, None);
    }
}
