//! Source adapters: one variant per upstream store.
//!
//! An adapter owns two store-specific concerns: unwrapping the search
//! envelope into raw items (plus an optional total-count hint) and mapping one
//! raw item onto the canonical [`Product`]. Both are pure.

pub mod extra;
pub mod jarir;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::database_ops::errors::MalformedRecordError;
use crate::database_ops::product::Product;

pub use extra::ExtraAdapter;
pub use jarir::JarirAdapter;

/// Raw items of one page plus the store's total-count hint when it sends one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageEnvelope {
    pub items: Vec<Value>,
    pub total: Option<usize>,
}

pub trait SourceAdapter {
    /// Store label written to the `source` column.
    fn source(&self) -> &str;
    fn category(&self) -> &str;
    /// Unwrap a response body. Shapes that do not match yield an empty page.
    fn parse_page(&self, body: &Value) -> PageEnvelope;
    fn extract(
        &self,
        raw: &Value,
        captured_at: DateTime<FixedOffset>,
    ) -> Result<Product, MalformedRecordError>;
}

/// Supported upstream stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    Extra,
    Jarir,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Extra => "extra",
            SourceKind::Jarir => "jarir",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            SourceKind::Extra => extra::DEFAULT_BASE_URL,
            SourceKind::Jarir => jarir::DEFAULT_BASE_URL,
        }
    }

    pub fn default_page_size(self) -> usize {
        match self {
            SourceKind::Extra => extra::DEFAULT_PAGE_SIZE,
            SourceKind::Jarir => jarir::DEFAULT_PAGE_SIZE,
        }
    }

    /// Query parameter carrying the cursor; `None` appends it to the URL path.
    pub fn default_page_param(self) -> Option<&'static str> {
        match self {
            SourceKind::Extra => Some("start"),
            SourceKind::Jarir => None,
        }
    }

    pub fn default_category(self) -> &'static str {
        match self {
            SourceKind::Extra => "tablets",
            SourceKind::Jarir => "laptops",
        }
    }

    pub fn default_spec_field(self) -> &'static str {
        match self {
            SourceKind::Extra => extra::DEFAULT_SPEC_FIELD,
            SourceKind::Jarir => jarir::DEFAULT_SPEC_FIELD,
        }
    }

    /// Static headers the store's edge expects from a browser.
    pub fn default_headers(self) -> Vec<(&'static str, &'static str)> {
        let mut headers = vec![
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            ),
            ("Accept", "application/json"),
            ("Accept-Language", "en-US,en;q=0.9,ar-EG;q=0.8,ar;q=0.7"),
            ("Cache-Control", "no-cache"),
            ("Pragma", "no-cache"),
        ];
        match self {
            SourceKind::Extra => {
                headers.push(("Host", "search.unbxd.io"));
                headers.push(("Referer", "https://www.extra.com/en-sa/"));
            }
            SourceKind::Jarir => {
                headers.push(("Host", "www.jarir.com"));
                headers.push(("Referer", "https://www.jarir.com/sa-en/"));
            }
        }
        headers
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extra" => Ok(SourceKind::Extra),
            "jarir" => Ok(SourceKind::Jarir),
            other => Err(anyhow::anyhow!("unknown source `{other}` (expected extra or jarir)")),
        }
    }
}

/// Run-level values bound to an adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub category: String,
    pub store: String,
    pub spec_field: String,
}

impl AdapterSettings {
    pub fn for_kind(kind: SourceKind) -> Self {
        Self {
            category: kind.default_category().to_string(),
            store: kind.as_str().to_string(),
            spec_field: kind.default_spec_field().to_string(),
        }
    }
}

/// Adapter selected by configuration.
#[derive(Debug, Clone)]
pub enum Adapter {
    Extra(ExtraAdapter),
    Jarir(JarirAdapter),
}

impl Adapter {
    pub fn new(kind: SourceKind, settings: AdapterSettings) -> Self {
        match kind {
            SourceKind::Extra => Adapter::Extra(ExtraAdapter::new(settings)),
            SourceKind::Jarir => Adapter::Jarir(JarirAdapter::new(settings)),
        }
    }

    fn inner(&self) -> &dyn SourceAdapter {
        match self {
            Adapter::Extra(a) => a,
            Adapter::Jarir(a) => a,
        }
    }
}

impl SourceAdapter for Adapter {
    fn source(&self) -> &str {
        self.inner().source()
    }

    fn category(&self) -> &str {
        self.inner().category()
    }

    fn parse_page(&self, body: &Value) -> PageEnvelope {
        self.inner().parse_page(body)
    }

    fn extract(
        &self,
        raw: &Value,
        captured_at: DateTime<FixedOffset>,
    ) -> Result<Product, MalformedRecordError> {
        self.inner().extract(raw, captured_at)
    }
}

/// Adapters only accept mapping-shaped items; everything past this check has a fallback.
pub(crate) fn require_object(raw: &Value) -> Result<&Value, MalformedRecordError> {
    if raw.is_object() {
        Ok(raw)
    } else {
        Err(MalformedRecordError {
            field: "item",
            reason: format!("is not a JSON object (got {})", json_kind(raw)),
        })
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("Extra".parse::<SourceKind>().unwrap(), SourceKind::Extra);
        assert_eq!(" jarir ".parse::<SourceKind>().unwrap(), SourceKind::Jarir);
        assert!("noon".parse::<SourceKind>().is_err());
    }

    #[test]
    fn adapter_binds_configured_labels() {
        let adapter = Adapter::new(
            SourceKind::Jarir,
            AdapterSettings {
                category: "phones".into(),
                store: "jarir-sa".into(),
                spec_field: "jarir_processor_type".into(),
            },
        );
        assert_eq!(adapter.category(), "phones");
        assert_eq!(adapter.source(), "jarir-sa");
    }

    #[test]
    fn non_object_items_are_malformed() {
        let adapter = Adapter::new(SourceKind::Extra, AdapterSettings::for_kind(SourceKind::Extra));
        let err = adapter
            .extract(&Value::String("oops".into()), crate::database_ops::product::capture_hour(chrono::Utc::now()))
            .unwrap_err();
        assert_eq!(err.field, "item");
    }
}
