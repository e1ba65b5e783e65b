//! Filtering raw records and deriving canonical transactions.
//!
//! Stages run in a fixed order, each one optional except the last two:
//!
//! 1. drop exact duplicate rows (first occurrence wins)
//! 2. drop rows without a customer id
//! 3. drop rows whose quantity is not positive
//! 4. drop rows whose unit price is not positive
//! 5. parse the invoice date and compute `total_price`
//! 6. drop anything that is still not a valid [`CanonicalTransaction`]
//!
//! Dropped rows are not reported individually; [`CleaningReport`] carries the
//! count removed by each stage.

use crate::records::{CanonicalTransaction, ColumnMapping, RawRecord};
use crate::validation::Validate;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Independent switches for the optional cleaning stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    pub remove_duplicate_transactions: bool,
    pub remove_null_customer_id: bool,
    pub remove_negative_quantity: bool,
    pub handle_missing_unit_price: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_duplicate_transactions: true,
            remove_null_customer_id: true,
            remove_negative_quantity: true,
            handle_missing_unit_price: true,
        }
    }
}

impl CleaningOptions {
    /// Every optional stage disabled; only the final validity filter runs.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            remove_duplicate_transactions: false,
            remove_null_customer_id: false,
            remove_negative_quantity: false,
            handle_missing_unit_price: false,
        }
    }
}

/// Rows removed by each cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub null_customer_removed: usize,
    pub non_positive_quantity_removed: usize,
    pub non_positive_price_removed: usize,
    pub invalid_removed: usize,
    pub output_rows: usize,
}

/// Parse a numeric cell. Anything unparseable is NaN.
#[must_use]
pub fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

static MDY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?)?$")
        .expect("valid M/D/Y pattern")
});

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

fn parse_mdy(raw: &str) -> Option<DateTime<Utc>> {
    let caps = MDY.captures(raw)?;
    let num = |i: usize| -> Option<u32> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    // from_ymd_opt rejects overflowing dates such as 2/30
    let date = NaiveDate::from_ymd_opt(year, num(1)?, num(2)?)?;
    // clock fields roll over like a calendar add, as long as the day holds
    let offset = TimeDelta::hours(i64::from(num(4)?))
        + TimeDelta::minutes(i64::from(num(5)?))
        + TimeDelta::seconds(i64::from(num(6)?));
    let stamp = date.and_time(NaiveTime::MIN).checked_add_signed(offset)?;
    (stamp.date() == date).then(|| Utc.from_utc_datetime(&stamp))
}

/// Parse an invoice date as UTC.
///
/// ISO-8601 forms are tried first (RFC 3339 with offset, or a naive date/time
/// taken as UTC), then `M/D/YYYY [H:m[:s]]`. Dates that do not exist on the
/// calendar are rejected rather than rolled over. Clock fields may overflow
/// into later hours (`8:75` is 09:15) but never into the next day.
///
/// # Examples
/// ```
/// use ironcart::clean::parse_invoice_date;
///
/// assert!(parse_invoice_date("12/1/2010 8:26").is_some());
/// assert!(parse_invoice_date("2/30/2023").is_none());
/// ```
#[must_use]
pub fn parse_invoice_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    parse_iso(raw).or_else(|| parse_mdy(raw))
}

/// The quantity and price filters only drop values that parse to `<= 0`.
/// Unparseable cells survive here and fall out later through a NaN total.
fn passes_positive_filter(raw: &str) -> bool {
    let v = parse_number(raw);
    v.is_nan() || v > 0.0
}

fn field<'r>(record: &'r RawRecord, header: &str) -> &'r str {
    record.get(header).unwrap_or("")
}

fn derive(record: &RawRecord, mapping: &ColumnMapping) -> Option<CanonicalTransaction> {
    let invoice_date = parse_invoice_date(field(record, &mapping.invoice_date))?;
    let quantity = parse_number(field(record, &mapping.quantity));
    let unit_price = parse_number(field(record, &mapping.unit_price));
    let txn = CanonicalTransaction {
        customer_id: field(record, &mapping.customer_id).trim().to_string(),
        invoice_id: field(record, &mapping.invoice_id).trim().to_string(),
        description: field(record, &mapping.description).trim().to_string(),
        invoice_date,
        quantity,
        unit_price,
        total_price: quantity * unit_price,
    };
    txn.is_valid().then_some(txn)
}

/// Clean `records` into canonical transactions.
#[must_use]
pub fn clean(
    records: &[RawRecord],
    mapping: &ColumnMapping,
    options: &CleaningOptions,
) -> Vec<CanonicalTransaction> {
    clean_with_report(records, mapping, options).0
}

/// Clean `records` and report how many rows each stage removed.
#[must_use]
pub fn clean_with_report(
    records: &[RawRecord],
    mapping: &ColumnMapping,
    options: &CleaningOptions,
) -> (Vec<CanonicalTransaction>, CleaningReport) {
    let mut report = CleaningReport {
        input_rows: records.len(),
        ..CleaningReport::default()
    };
    let mut rows: Vec<&RawRecord> = records.iter().collect();

    if options.remove_duplicate_transactions {
        let mut seen = HashSet::with_capacity(rows.len());
        let before = rows.len();
        rows.retain(|r| seen.insert(*r));
        report.duplicates_removed = before - rows.len();
    }

    if options.remove_null_customer_id {
        let before = rows.len();
        rows.retain(|r| !field(r, &mapping.customer_id).trim().is_empty());
        report.null_customer_removed = before - rows.len();
    }

    if options.remove_negative_quantity {
        let before = rows.len();
        rows.retain(|r| passes_positive_filter(field(r, &mapping.quantity)));
        report.non_positive_quantity_removed = before - rows.len();
    }

    if options.handle_missing_unit_price {
        let before = rows.len();
        rows.retain(|r| passes_positive_filter(field(r, &mapping.unit_price)));
        report.non_positive_price_removed = before - rows.len();
    }

    let before = rows.len();
    let transactions: Vec<CanonicalTransaction> =
        rows.into_iter().filter_map(|r| derive(r, mapping)).collect();
    report.invalid_removed = before - transactions.len();
    report.output_rows = transactions.len();

    debug!(?report, "cleaning stages");
    info!(
        input = report.input_rows,
        output = report.output_rows,
        "cleaned transactions"
    );
    (transactions, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn mdy_with_time() {
        let d = parse_invoice_date("12/1/2010 8:26").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2010, 12, 1));
        assert_eq!((d.hour(), d.minute(), d.second()), (8, 26, 0));
    }

    #[test]
    fn mdy_rejects_overflow() {
        assert!(parse_invoice_date("2/30/2023").is_none());
        assert!(parse_invoice_date("13/1/2023").is_none());
        assert!(parse_invoice_date("2/29/2024").is_some());
    }

    #[test]
    fn mdy_clock_rolls_over_within_the_day() {
        let d = parse_invoice_date("12/1/2010 8:75").unwrap();
        assert_eq!((d.day(), d.hour(), d.minute()), (1, 9, 15));
        let d = parse_invoice_date("12/1/2010 23:58:90").unwrap();
        assert_eq!((d.day(), d.hour(), d.minute(), d.second()), (1, 23, 59, 30));

        assert!(parse_invoice_date("12/1/2010 24:00").is_none());
        assert!(parse_invoice_date("12/1/2010 23:59:60").is_none());
    }

    #[test]
    fn iso_variants_are_utc() {
        let a = parse_invoice_date("2011-01-05T10:00:00Z").unwrap();
        let b = parse_invoice_date("2011-01-05 10:00:00").unwrap();
        let c = parse_invoice_date("2011-01-05T12:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(parse_invoice_date("2011-01-05").unwrap().hour(), 0);
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_invoice_date("yesterday").is_none());
        assert!(parse_invoice_date("").is_none());
    }

    #[test]
    fn numbers_parse_or_nan() {
        assert_eq!(parse_number(" 2.5 "), 2.5);
        assert!(parse_number("n/a").is_nan());
    }
}
