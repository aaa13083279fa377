use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;

pub const NO_NAME: &str = "No Name Available";
pub const NO_SPECS: &str = "No Specs Available";
pub const NO_BRAND: &str = "No Brand Available";
pub const NO_LINK: &str = "No URL Available";

/// Capture timestamps are written at a fixed UTC+3 offset.
pub const CAPTURE_OFFSET_SECS: i32 = 3 * 3600;

/// Canonical product record produced by every source adapter.
///
/// `category` and `source` come from the run configuration, never from the
/// payload. Prices stay `None` only where the adapter documents a null
/// fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub name: String,
    pub specs: String,
    pub new_price: Option<BigDecimal>,
    pub old_price: Option<BigDecimal>,
    pub brand: String,
    pub link: String,
    pub category: String,
    pub captured_at: DateTime<FixedOffset>,
    pub in_stock: bool,
    pub source: String,
}

fn capture_offset() -> FixedOffset {
    FixedOffset::east_opt(CAPTURE_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Shift an instant to UTC+3 and truncate it to the top of the hour.
///
/// All products of one run share this value, so it doubles as the batch key.
pub fn capture_hour(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let local = now.with_timezone(&capture_offset());
    let truncated = local
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0));
    // with_minute/with_second/with_nanosecond(0) cannot land in a gap on a fixed offset
    truncated.unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn capture_hour_truncates_and_shifts_to_utc_plus_three() {
        let now = Utc.with_ymd_and_hms(2024, 9, 21, 22, 47, 13).unwrap()
            + chrono::Duration::microseconds(512);
        let hour = capture_hour(now);
        assert_eq!(hour.offset().local_minus_utc(), CAPTURE_OFFSET_SECS);
        assert_eq!(hour.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-09-22 01:00:00");
        assert_eq!(hour.minute(), 0);
        assert_eq!(hour.second(), 0);
        assert_eq!(hour.nanosecond(), 0);
    }

    #[test]
    fn capture_hour_is_stable_within_an_hour() {
        let a = capture_hour(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let b = capture_hour(Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 59).unwrap());
        assert_eq!(a, b);
    }
}
