//! Customer-lifetime-value projection from RFM records.
//!
//! The model is the classic `value per period / (churn + discount)` form:
//!
//! ```text
//! aov  = monetary / frequency
//! cltv = (aov * frequency / (churn + discount_rate)) * profit_margin
//! ```
//!
//! Churn is taken from [`CltvParams::churn_override`] when set, otherwise it
//! is `1 - repeat_rate` where the repeat rate is the share of customers with
//! more than one transaction.
//!
//! When `churn + discount_rate <= 0` the division is meaningless and the value
//! falls back to `aov * frequency * profit_margin * 100`.

use crate::rfm::{RfmRecord, Segment};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Multiplier used when the churn/discount denominator is not positive.
pub const DEGENERATE_MULTIPLIER: f64 = 100.0;

/// Economic assumptions for the projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CltvParams {
    pub profit_margin: f64,
    pub discount_rate: f64,
    /// Fixed churn rate in `[0, 1]`; `None` derives it from the repeat rate.
    pub churn_override: Option<f64>,
}

impl Default for CltvParams {
    fn default() -> Self {
        Self {
            profit_margin: 0.2,
            discount_rate: 0.1,
            churn_override: None,
        }
    }
}

/// Average CLTV of one RFM segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvSegmentRecord {
    pub segment: Segment,
    pub customer_count: usize,
    pub avg_cltv: f64,
}

/// Projected value of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvCustomerRecord {
    pub customer_id: String,
    pub cltv: f64,
    pub avg_order_value: f64,
    pub purchase_frequency: f64,
    pub segment: Segment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CltvResult {
    /// Sorted by `avg_cltv`, highest first.
    pub segment_summaries: Vec<CltvSegmentRecord>,
    /// Sorted by `cltv`, highest first; ties by customer id.
    pub customer_details: Vec<CltvCustomerRecord>,
    pub repeat_rate: f64,
    pub effective_churn: f64,
}

/// Value of a customer (or segment average) under the given churn.
///
/// # Examples
/// ```
/// use ironcart::cltv::lifetime_value;
///
/// // 2 orders of 50 at 20% margin, churn 0.4 + discount 0.1
/// assert!((lifetime_value(50.0, 2.0, 0.2, 0.4, 0.1) - 40.0).abs() < 1e-9);
/// // non-positive denominator takes the fallback branch
/// assert!((lifetime_value(50.0, 2.0, 0.2, 0.0, 0.0) - 2000.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn lifetime_value(
    avg_order_value: f64,
    frequency: f64,
    profit_margin: f64,
    churn: f64,
    discount_rate: f64,
) -> f64 {
    let denominator = churn + discount_rate;
    if denominator <= 0.0 {
        avg_order_value * frequency * profit_margin * DEGENERATE_MULTIPLIER
    } else {
        (avg_order_value * frequency / denominator) * profit_margin
    }
}

#[allow(clippy::cast_precision_loss)]
fn average_order_value(monetary: f64, frequency: u64) -> f64 {
    if frequency == 0 {
        0.0
    } else {
        monetary / frequency as f64
    }
}

#[derive(Default)]
struct SegmentTotals {
    customers: usize,
    monetary: f64,
    frequency: u64,
}

/// Project CLTV for every customer and summarise it per segment.
///
/// Empty input yields an empty result with a repeat rate of 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_cltv(records: &[RfmRecord], params: &CltvParams) -> CltvResult {
    if records.is_empty() {
        return CltvResult {
            effective_churn: params.churn_override.unwrap_or(1.0),
            ..CltvResult::default()
        };
    }

    let repeaters = records.iter().filter(|r| r.frequency > 1).count();
    let repeat_rate = repeaters as f64 / records.len() as f64;
    let churn = params.churn_override.unwrap_or(1.0 - repeat_rate);
    if churn + params.discount_rate <= 0.0 {
        warn!(
            churn,
            discount_rate = params.discount_rate,
            "churn + discount is not positive, using fallback CLTV multiplier"
        );
    }
    let value = |aov: f64, freq: f64| {
        lifetime_value(aov, freq, params.profit_margin, churn, params.discount_rate)
    };

    let mut customer_details: Vec<CltvCustomerRecord> = records
        .iter()
        .map(|r| {
            let aov = average_order_value(r.monetary, r.frequency);
            let freq = r.frequency as f64;
            CltvCustomerRecord {
                customer_id: r.customer_id.clone(),
                cltv: value(aov, freq),
                avg_order_value: aov,
                purchase_frequency: freq,
                segment: r.segment,
            }
        })
        .collect();
    customer_details.sort_by(|a, b| {
        OrderedFloat(b.cltv)
            .cmp(&OrderedFloat(a.cltv))
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });

    let mut totals: BTreeMap<Segment, SegmentTotals> = BTreeMap::new();
    for r in records {
        let t = totals.entry(r.segment).or_default();
        t.customers += 1;
        t.monetary += r.monetary;
        t.frequency += r.frequency;
    }
    let mut segment_summaries: Vec<CltvSegmentRecord> = totals
        .into_iter()
        .map(|(segment, t)| {
            let aov = average_order_value(t.monetary, t.frequency);
            let purchase_frequency = t.frequency as f64 / t.customers as f64;
            CltvSegmentRecord {
                segment,
                customer_count: t.customers,
                avg_cltv: value(aov, purchase_frequency),
            }
        })
        .collect();
    // stable sort keeps segment order for equal averages
    segment_summaries.sort_by_key(|s| Reverse(OrderedFloat(s.avg_cltv)));

    info!(
        customers = customer_details.len(),
        segments = segment_summaries.len(),
        repeat_rate,
        churn,
        "computed CLTV"
    );
    CltvResult {
        segment_summaries,
        customer_details,
        repeat_rate,
        effective_churn: churn,
    }
}
