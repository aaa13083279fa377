//! Coercions from loosely-typed JSON fields into the canonical column types.
//!
//! Upstream search APIs are inconsistent about encodings (prices as numbers or
//! strings, stock flags as booleans or `1`/`0`), so every helper here accepts
//! the shapes seen in the wild and returns `None` for anything else.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;

/// Non-empty trimmed string field.
pub fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decimal price from a JSON number or numeric string.
pub fn decimal_value(v: &Value) -> Option<BigDecimal> {
    match v {
        // Number's Display keeps the literal digits, avoiding an f64 round-trip
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                None
            } else {
                BigDecimal::from_str(&cleaned).ok()
            }
        }
        _ => None,
    }
}

pub fn decimal_field(item: &Value, key: &str) -> Option<BigDecimal> {
    item.get(key).and_then(decimal_value)
}

/// Stock flag from either a native boolean or an integer/string where `1` means in stock.
pub fn stock_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i == 1)
            .or_else(|| n.as_f64().map(|f| f == 1.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// First non-empty string of a string-or-list field.
pub fn first_string(item: &Value, key: &str) -> Option<String> {
    let v = item.get(key)?;
    let s = match v {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Total-count hint; accepts a bare number or an Elasticsearch-style `{"value": n}`.
pub fn count_value(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::Object(map) => map.get("value").and_then(count_value),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
