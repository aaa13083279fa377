use crate::database_ops::product::{NO_BRAND, NO_NAME, NO_SPECS};

/// Supplementary values that stores use to mean "nothing to say".
const NOT_APPLICABLE: &[&str] = &["na", "n/a", "not applicable"];

/// Store spellings that should be displayed differently.
const BRAND_SPELLINGS: &[(&str, &str)] = &[
    ("TECNO", "Tecno"),
    ("APPLE", "Apple"),
    ("NOKIA", "Nokia"),
    ("XIAOMI", "Xiaomi"),
    ("VIVO", "Vivo"),
    ("MOTOROLA", "Motorola"),
    ("HUAWEI", "Huawei"),
    ("NOTHING", "Nothing"),
    ("REALME", "Realme"),
    ("HONOR", "Honor"),
    ("SAMSNG", "Samsung"),
    ("SAMSUNG", "Samsung"),
    ("INFINIX", "Infinix"),
    ("LENOVO", "Lenovo"),
];

/// Split a combined title on its first comma.
///
/// `"Galaxy S21, 128GB, Black"` becomes `("Galaxy S21", "128GB, Black")`; a
/// title without a comma (or with nothing after it) gets the specs sentinel,
/// and one with nothing before it gets the name sentinel.
pub fn split_name_specs(raw: &str) -> (String, String) {
    let (name, rest) = raw.split_once(',').unwrap_or((raw, ""));
    let name = name.trim();
    let rest = rest.trim();
    let name = if name.is_empty() { NO_NAME } else { name };
    let specs = if rest.is_empty() { NO_SPECS } else { rest };
    (name.to_string(), specs.to_string())
}

pub fn is_not_applicable(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || NOT_APPLICABLE.iter().any(|na| v.eq_ignore_ascii_case(na))
}

/// Append a supplementary descriptor to `specs`.
///
/// The sentinel is replaced outright rather than prefixed; not-applicable
/// values are dropped.
pub fn enrich_specs(specs: String, extra: Option<&str>) -> String {
    let Some(extra) = extra.filter(|e| !is_not_applicable(e)) else {
        return specs;
    };
    let extra = extra.trim();
    if specs == NO_SPECS {
        extra.to_string()
    } else {
        format!("{specs}, {extra}")
    }
}

pub fn format_brand(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|b| !b.is_empty()) else {
        return NO_BRAND.to_string();
    };
    let upper = raw.to_uppercase();
    BRAND_SPELLINGS
        .iter()
        .find(|(store, _)| *store == upper)
        .map(|(_, display)| (*display).to_string())
        .unwrap_or_else(|| raw.to_string())
}
